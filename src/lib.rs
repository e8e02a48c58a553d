// Campaign Import - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod locale;    // Brazilian number/date normalization
pub mod headers;   // Header synonyms -> canonical fields
pub mod parser;    // Delimited text -> RawRow
pub mod validator; // Row rules, collects every error
pub mod model;
pub mod metrics;
pub mod importer;  // All-or-nothing batch import
pub mod db;        // SQLite store
pub mod config;

// Re-export commonly used types
pub use error::{FieldError, ImportError};
pub use headers::{map_header, normalize_header, Field};
pub use parser::{parse_bytes, Delimiter, ParseDiagnostics, ParsedFile, RawRow};
pub use validator::{validate_row, validate_rows, ValidationError};
pub use model::{
    CampaignRecord, CampaignStatus, ImportOutcome, ImportStatus, RecordViolation,
    StoredCampaign, StoredImportOutcome,
};
pub use metrics::{derive, summarize, CampaignMetrics, PortfolioSummary};
pub use importer::{
    display_error_lines, parse_and_validate, CampaignStore, ImportSummary, Importer, Preview,
    DEFAULT_ERROR_DISPLAY_LIMIT,
};
pub use db::SqliteStore;
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
