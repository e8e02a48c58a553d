// Campaign Record and Import Outcome
// Canonical, post-validation types handed to the store. Identity and
// timestamps are assigned by the store on create; nothing here invents them.

use crate::error::FieldError;
use crate::headers::Field;
use crate::locale;
use crate::parser::RawRow;
use crate::validator::{self, messages, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CAMPAIGN STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    /// Lowercased, trimmed match against the known values
    pub fn parse(raw: &str) -> Option<CampaignStatus> {
        match raw.trim().to_lowercase().as_str() {
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CAMPAIGN RECORD
// ============================================================================

/// A campaign as it is committed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub name: String,
    pub status: CampaignStatus,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub spend: f64,
    pub leads_generated: i64,
    pub conversions: i64,
    pub revenue: f64,
}

/// A record-level rule the manual-entry path rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordViolation {
    pub field: Field,
    pub message: String,
}

impl fmt::Display for RecordViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.field, self.message)
    }
}

impl CampaignRecord {
    /// Convert a raw row into a record.
    ///
    /// The row is validated first; any validation error is returned instead
    /// of a record. Blank optional numbers become 0 and a blank end date is absent.
    pub fn from_raw_row(row: &RawRow) -> Result<CampaignRecord, Vec<ValidationError>> {
        let errors = validator::validate_row(row);
        if !errors.is_empty() {
            return Err(errors);
        }

        let at = |field: Field| {
            move |err: FieldError| vec![ValidationError::new(row.row_number, field, &err.to_string())]
        };

        let status = CampaignStatus::parse(row.get(Field::Status).unwrap_or("")).ok_or_else(|| {
            vec![ValidationError::new(
                row.row_number,
                Field::Status,
                messages::INVALID_STATUS,
            )]
        })?;

        let start_date =
            locale::parse_date(row.get(Field::StartDate).unwrap_or("")).map_err(at(Field::StartDate))?;

        let end_date = match row.get_non_blank(Field::EndDate) {
            Some(value) => Some(locale::parse_date(value).map_err(at(Field::EndDate))?),
            None => None,
        };

        Ok(CampaignRecord {
            name: row.get(Field::Name).unwrap_or("").trim().to_string(),
            status,
            start_date,
            end_date,
            spend: locale::parse_optional_decimal(row.get(Field::Spend)).map_err(at(Field::Spend))?,
            leads_generated: locale::parse_optional_integer(row.get(Field::LeadsGenerated))
                .map_err(at(Field::LeadsGenerated))?,
            conversions: locale::parse_optional_integer(row.get(Field::Conversions))
                .map_err(at(Field::Conversions))?,
            revenue: locale::parse_optional_decimal(row.get(Field::Revenue))
                .map_err(at(Field::Revenue))?,
        })
    }

    /// Check the record-level invariants before a manual create or update
    pub fn validate(&self) -> Result<(), Vec<RecordViolation>> {
        let mut violations = Vec::new();
        let mut fail = |field: Field, message: &str| {
            violations.push(RecordViolation {
                field,
                message: message.to_string(),
            });
        };

        if self.name.trim().is_empty() {
            fail(Field::Name, messages::NAME_REQUIRED);
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                fail(Field::EndDate, messages::END_BEFORE_START);
            }
        }
        if self.conversions > self.leads_generated {
            fail(Field::Conversions, messages::CONVERSIONS_EXCEED_LEADS);
        }
        if self.spend < 0.0 || !self.spend.is_finite() {
            fail(Field::Spend, messages::NEGATIVE_SPEND);
        }
        if self.leads_generated < 0 {
            fail(Field::LeadsGenerated, messages::NEGATIVE_LEADS);
        }
        if self.conversions < 0 {
            fail(Field::Conversions, messages::NEGATIVE_CONVERSIONS);
        }
        if self.revenue < 0.0 || !self.revenue.is_finite() {
            fail(Field::Revenue, messages::NEGATIVE_REVENUE);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// A record together with the identity the store assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCampaign {
    pub id: String,
    #[serde(flatten)]
    pub record: CampaignRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// IMPORT OUTCOME (audit record)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Failure,
    /// Reserved for partial-commit strategies; the all-or-nothing importer never produces it
    Partial,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "success",
            ImportStatus::Failure => "failure",
            ImportStatus::Partial => "partial",
        }
    }

    pub fn parse(raw: &str) -> Option<ImportStatus> {
        match raw {
            "success" => Some(ImportStatus::Success),
            "failure" => Some(ImportStatus::Failure),
            "partial" => Some(ImportStatus::Partial),
            _ => None,
        }
    }
}

/// One import attempt, written once and never modified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub file_name: String,
    pub record_count: usize,
    pub status: ImportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ImportOutcome {
    pub fn success(file_name: &str, record_count: usize) -> Self {
        ImportOutcome {
            file_name: file_name.to_string(),
            record_count,
            status: ImportStatus::Success,
            error_detail: None,
        }
    }

    pub fn failure(file_name: &str, error_detail: &str) -> Self {
        ImportOutcome {
            file_name: file_name.to_string(),
            record_count: 0,
            status: ImportStatus::Failure,
            error_detail: Some(error_detail.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImportOutcome {
    pub id: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, locale::DATE_FORMAT).unwrap()
    }

    fn sample_record() -> CampaignRecord {
        CampaignRecord {
            name: "Verão 2024".to_string(),
            status: CampaignStatus::Active,
            start_date: date("2024-01-01"),
            end_date: Some(date("2024-03-31")),
            spend: 1500.0,
            leads_generated: 100,
            conversions: 20,
            revenue: 6000.0,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(CampaignStatus::parse(" Active "), Some(CampaignStatus::Active));
        assert_eq!(CampaignStatus::parse("COMPLETED"), Some(CampaignStatus::Completed));
        assert_eq!(CampaignStatus::parse("ativa"), None);
        assert_eq!(CampaignStatus::parse(""), None);
    }

    #[test]
    fn test_from_raw_row_applies_defaults() {
        let row = RawRow::new(2)
            .with_field("name", "  Natal  ")
            .with_field("status", "PAUSED")
            .with_field("startDate", "2024-12-01")
            .with_field("endDate", "")
            .with_field("spend", "1.234,56")
            .with_field("leadsGenerated", "")
            .with_field("canal", "email");

        let record = CampaignRecord::from_raw_row(&row).unwrap();
        assert_eq!(record.name, "Natal");
        assert_eq!(record.status, CampaignStatus::Paused);
        assert_eq!(record.start_date, date("2024-12-01"));
        assert_eq!(record.end_date, None);
        assert_eq!(record.spend, 1234.56);
        assert_eq!(record.leads_generated, 0);
        assert_eq!(record.conversions, 0);
        assert_eq!(record.revenue, 0.0);
    }

    #[test]
    fn test_from_raw_row_rejects_invalid_row() {
        let row = RawRow::new(9).with_field("name", "Sem status");
        let errors = CampaignRecord::from_raw_row(&row).unwrap_err();
        assert!(errors.iter().all(|e| e.row_number == 9));
        assert!(errors.iter().any(|e| e.field == Field::Status));
    }

    #[test]
    fn test_record_validate() {
        assert!(sample_record().validate().is_ok());

        let mut record = sample_record();
        record.name = " ".to_string();
        record.end_date = Some(date("2023-12-31"));
        record.conversions = 101;
        record.spend = -1.0;

        let fields: Vec<Field> = record
            .validate()
            .unwrap_err()
            .into_iter()
            .map(|v| v.field)
            .collect();
        assert_eq!(
            fields,
            vec![Field::Name, Field::EndDate, Field::Conversions, Field::Spend]
        );
    }

    #[test]
    fn test_record_serializes_canonical_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["startDate"], "2024-01-01");
        assert_eq!(json["endDate"], "2024-03-31");
        assert_eq!(json["leadsGenerated"], 100);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_import_outcome_constructors() {
        let ok = ImportOutcome::success("campanhas.csv", 12);
        assert_eq!(ok.status, ImportStatus::Success);
        assert_eq!(ok.record_count, 12);
        assert!(ok.error_detail.is_none());

        let failed = ImportOutcome::failure("campanhas.csv", "connection reset");
        assert_eq!(failed.status, ImportStatus::Failure);
        assert_eq!(failed.record_count, 0);
        assert_eq!(failed.error_detail.as_deref(), Some("connection reset"));

        assert_eq!(ImportStatus::parse(ImportStatus::Partial.as_str()), Some(ImportStatus::Partial));
    }
}
