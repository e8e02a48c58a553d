// Batch Importer
// Parser -> Validator over every row, then an all-or-nothing commit.
//
// A file with any validation error commits nothing. A clean file is converted
// to records and submitted as one bulk insert; the outcome of that attempt is
// written to the import history afterwards.

use crate::error::ImportError;
use crate::model::{CampaignRecord, ImportOutcome, StoredCampaign, StoredImportOutcome};
use crate::parser::{self, ParseDiagnostics, RawRow};
use crate::validator::{self, ValidationError};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// How many errors are shown by default; all of them are always computed
pub const DEFAULT_ERROR_DISPLAY_LIMIT: usize = 5;

// ============================================================================
// STORE SEAM
// ============================================================================

/// The persistence collaborator the importer commits through
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert every record or none of them
    async fn insert_many(&self, records: &[CampaignRecord]) -> Result<Vec<StoredCampaign>>;

    /// Append one entry to the import history
    async fn record_import_outcome(&self, outcome: &ImportOutcome) -> Result<StoredImportOutcome>;
}

#[async_trait]
impl<T: CampaignStore + ?Sized> CampaignStore for Arc<T> {
    async fn insert_many(&self, records: &[CampaignRecord]) -> Result<Vec<StoredCampaign>> {
        (**self).insert_many(records).await
    }

    async fn record_import_outcome(&self, outcome: &ImportOutcome) -> Result<StoredImportOutcome> {
        (**self).record_import_outcome(outcome).await
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Parse + validate result used for previews; nothing is committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub rows: Vec<RawRow>,
    pub errors: Vec<ValidationError>,
    pub diagnostics: ParseDiagnostics,
}

impl Preview {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of [`Importer::import_file`] when no exceptional error occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub file_name: String,
    pub committed_count: usize,
    /// Every validation error in the file, in row order
    pub errors: Vec<ValidationError>,
    /// History entry, present once the commit stage was reached
    pub outcome: Option<StoredImportOutcome>,
    pub diagnostics: ParseDiagnostics,
}

impl ImportSummary {
    pub fn is_committed(&self) -> bool {
        self.errors.is_empty() && self.outcome.is_some()
    }

    /// First `limit` errors as display lines, plus a trailer for the rest
    pub fn display_lines(&self, limit: usize) -> Vec<String> {
        display_error_lines(&self.errors, limit)
    }

    /// Turn a blocked import into [`ImportError::ValidationFailed`]
    pub fn into_result(self) -> Result<ImportSummary, ImportError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(ImportError::ValidationFailed {
                error_count: self.errors.len(),
            })
        }
    }
}

/// Render errors as `Row <n>: <field> - <message>`, capped at `limit`
pub fn display_error_lines(errors: &[ValidationError], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = errors.iter().take(limit).map(|e| e.to_string()).collect();

    if errors.len() > limit {
        lines.push(format!("... and {} more errors", errors.len() - limit));
    }

    lines
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Parse and validate without committing. Pure with respect to the bytes.
pub fn parse_and_validate(bytes: &[u8]) -> Result<Preview, ImportError> {
    let parsed = parser::parse_bytes(bytes)?;
    let errors = validator::validate_rows(&parsed.rows);

    info!(
        rows = parsed.rows.len(),
        errors = errors.len(),
        "validated file"
    );

    Ok(Preview {
        rows: parsed.rows,
        errors,
        diagnostics: parsed.diagnostics,
    })
}

pub struct Importer<S> {
    store: S,
}

impl<S: CampaignStore> Importer<S> {
    pub fn new(store: S) -> Self {
        Importer { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full pipeline: parse, validate every row, commit only when the file is clean.
    ///
    /// Returns `Err` only for [`ImportError::UnparseableFile`] and
    /// [`ImportError::StoreFailure`]; a blocked file comes back as a summary
    /// carrying its errors and zero committed records.
    pub async fn import_file(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ImportSummary, ImportError> {
        let preview = parse_and_validate(bytes)?;

        if !preview.errors.is_empty() {
            warn!(
                file = file_name,
                errors = preview.errors.len(),
                "import blocked by validation errors"
            );
            return Ok(ImportSummary {
                file_name: file_name.to_string(),
                committed_count: 0,
                errors: preview.errors,
                outcome: None,
                diagnostics: preview.diagnostics,
            });
        }

        let records = match preview
            .rows
            .iter()
            .map(CampaignRecord::from_raw_row)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(records) => records,
            Err(errors) => {
                return Ok(ImportSummary {
                    file_name: file_name.to_string(),
                    committed_count: 0,
                    errors,
                    outcome: None,
                    diagnostics: preview.diagnostics,
                });
            }
        };

        let stored = match self.store.insert_many(&records).await {
            Ok(stored) => stored,
            Err(e) => {
                let err = ImportError::store(e.context("bulk insert failed"));
                self.record_failure(file_name, &err).await;
                return Err(err);
            }
        };

        let outcome = ImportOutcome::success(file_name, stored.len());
        let saved = match self.store.record_import_outcome(&outcome).await {
            Ok(saved) => saved,
            Err(e) => {
                let err = ImportError::store(e.context("failed to record import outcome"));
                self.record_failure(file_name, &err).await;
                return Err(err);
            }
        };

        info!(file = file_name, committed = stored.len(), "import committed");

        Ok(ImportSummary {
            file_name: file_name.to_string(),
            committed_count: stored.len(),
            errors: Vec::new(),
            outcome: Some(saved),
            diagnostics: preview.diagnostics,
        })
    }

    // Best effort: the attempt stays in history when the audit write still works
    async fn record_failure(&self, file_name: &str, err: &ImportError) {
        let outcome = ImportOutcome::failure(file_name, &err.to_string());
        match self.store.record_import_outcome(&outcome).await {
            Ok(_) => warn!(file = file_name, error = %err, "import failed"),
            Err(audit_err) => warn!(
                file = file_name,
                error = %err,
                audit_error = %audit_err,
                "import failed and the failure could not be recorded"
            ),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
