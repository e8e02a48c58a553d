// Row Validator
// Applies the full rule set to one raw row. Every rule runs regardless of
// earlier failures in the same row, so the error list is exhaustive.
//
// Rules 6-9 check that numeric cells parse; rules 10-11 (and the extra
// non-negativity checks) re-read the same cells with zero as fallback, so a
// bad numeric string can never hide a business-rule violation.

use crate::headers::Field;
use crate::locale::{self, decimal_or_zero, integer_or_zero};
use crate::model::CampaignStatus;
use crate::parser::RawRow;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ============================================================================
// MESSAGES
// ============================================================================

pub mod messages {
    pub const NAME_REQUIRED: &str = "name required";
    pub const INVALID_STATUS: &str = "invalid status";
    pub const START_DATE_REQUIRED: &str = "start date required";
    pub const INVALID_START_DATE: &str = "invalid start date";
    pub const INVALID_END_DATE: &str = "invalid end date";
    pub const END_BEFORE_START: &str = "end date must be after start date";
    pub const INVALID_SPEND: &str = "invalid spend";
    pub const INVALID_LEADS: &str = "invalid leads";
    pub const INVALID_CONVERSIONS: &str = "invalid conversions";
    pub const INVALID_REVENUE: &str = "invalid revenue";
    pub const CONVERSIONS_EXCEED_LEADS: &str = "conversions exceeds leads";
    pub const NEGATIVE_SPEND: &str = "spend cannot be negative";
    pub const NEGATIVE_LEADS: &str = "leads cannot be negative";
    pub const NEGATIVE_CONVERSIONS: &str = "conversions cannot be negative";
    pub const NEGATIVE_REVENUE: &str = "revenue cannot be negative";
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// One rule violation, tagged with the row number the user sees in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub row_number: usize,
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(row_number: usize, field: Field, message: &str) -> Self {
        ValidationError {
            row_number,
            field,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {} - {}", self.row_number, self.field, self.message)
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Validate one row. An empty result means the row is valid.
pub fn validate_row(row: &RawRow) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut fail = |field: Field, message: &str| {
        errors.push(ValidationError::new(row.row_number, field, message));
    };

    // Rule 1: name present and non-blank
    if row.get_non_blank(Field::Name).is_none() {
        fail(Field::Name, messages::NAME_REQUIRED);
    }

    // Rule 2: status is a known value
    if CampaignStatus::parse(row.get(Field::Status).unwrap_or("")).is_none() {
        fail(Field::Status, messages::INVALID_STATUS);
    }

    // Rule 3: start date required and well-formed
    let start_date = row.get_non_blank(Field::StartDate);
    match start_date {
        None => fail(Field::StartDate, messages::START_DATE_REQUIRED),
        Some(value) if locale::parse_date(value).is_err() => {
            fail(Field::StartDate, messages::INVALID_START_DATE)
        }
        Some(_) => {}
    }

    // Rule 4: end date, if given, well-formed
    let end_date = row.get_non_blank(Field::EndDate);
    if let Some(value) = end_date {
        if locale::parse_date(value).is_err() {
            fail(Field::EndDate, messages::INVALID_END_DATE);
        }
    }

    // Rule 5: end date not before start date (only when both are valid)
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if let (Ok(start), Ok(end)) = (locale::parse_date(start), locale::parse_date(end)) {
            if end < start {
                fail(Field::EndDate, messages::END_BEFORE_START);
            }
        }
    }

    // Rules 6-9: numeric cells parse
    let (spend, spend_ok) = decimal_or_zero(row.get(Field::Spend));
    if !spend_ok {
        fail(Field::Spend, messages::INVALID_SPEND);
    }

    let (leads, leads_ok) = integer_or_zero(row.get(Field::LeadsGenerated));
    if !leads_ok {
        fail(Field::LeadsGenerated, messages::INVALID_LEADS);
    }

    let (conversions, conversions_ok) = integer_or_zero(row.get(Field::Conversions));
    if !conversions_ok {
        fail(Field::Conversions, messages::INVALID_CONVERSIONS);
    }

    let (revenue, revenue_ok) = decimal_or_zero(row.get(Field::Revenue));
    if !revenue_ok {
        fail(Field::Revenue, messages::INVALID_REVENUE);
    }

    // Rule 10: conversions never exceed leads (runs on fallback values too)
    if conversions > leads {
        fail(Field::Conversions, messages::CONVERSIONS_EXCEED_LEADS);
    }

    // Rule 11: spend non-negative
    if spend < 0.0 {
        fail(Field::Spend, messages::NEGATIVE_SPEND);
    }

    // Remaining amounts are non-negative in the data model as well
    if leads < 0 {
        fail(Field::LeadsGenerated, messages::NEGATIVE_LEADS);
    }
    if conversions < 0 {
        fail(Field::Conversions, messages::NEGATIVE_CONVERSIONS);
    }
    if revenue < 0.0 {
        fail(Field::Revenue, messages::NEGATIVE_REVENUE);
    }

    if !errors.is_empty() {
        debug!(row = row.row_number, errors = errors.len(), "row failed validation");
    }

    errors
}

/// Validate every row, keeping row order and per-row rule order
pub fn validate_rows(rows: &[RawRow]) -> Vec<ValidationError> {
    rows.iter().flat_map(validate_row).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_row(row_number: usize) -> RawRow {
        RawRow::new(row_number)
            .with_field("name", "Black Friday")
            .with_field("status", "active")
            .with_field("startDate", "2024-11-01")
            .with_field("endDate", "2024-11-30")
            .with_field("spend", "1.500,00")
            .with_field("leadsGenerated", "120")
            .with_field("conversions", "30")
            .with_field("revenue", "9.000,00")
    }

    fn fields(errors: &[ValidationError]) -> Vec<(Field, &str)> {
        errors.iter().map(|e| (e.field, e.message.as_str())).collect()
    }

    #[test]
    fn test_valid_row_has_no_errors() {
        assert!(validate_row(&valid_row(2)).is_empty());
    }

    #[test]
    fn test_minimal_row_is_valid() {
        let row = RawRow::new(2)
            .with_field("name", "Only required")
            .with_field("status", "Paused ")
            .with_field("startDate", "2024-01-01");
        assert!(validate_row(&row).is_empty());
    }

    #[test]
    fn test_name_and_status_required() {
        let row = valid_row(3)
            .with_field("name", "   ")
            .with_field("status", "");

        let errors = validate_row(&row);
        assert_eq!(
            fields(&errors),
            vec![
                (Field::Name, messages::NAME_REQUIRED),
                (Field::Status, messages::INVALID_STATUS),
            ]
        );
        assert!(errors.iter().all(|e| e.row_number == 3));
    }

    #[test]
    fn test_status_values() {
        for status in ["active", "PAUSED", " completed "] {
            let row = valid_row(2).with_field("status", status);
            assert!(validate_row(&row).is_empty(), "{} should be accepted", status);
        }
        let row = valid_row(2).with_field("status", "archived");
        assert_eq!(fields(&validate_row(&row)), vec![(Field::Status, messages::INVALID_STATUS)]);
    }

    #[test]
    fn test_missing_status_column() {
        let mut row = valid_row(2);
        row.fields.remove("status");
        assert_eq!(fields(&validate_row(&row)), vec![(Field::Status, messages::INVALID_STATUS)]);
    }

    #[test]
    fn test_start_date_required_and_shape() {
        let mut row = valid_row(2);
        row.fields.remove("startDate");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![(Field::StartDate, messages::START_DATE_REQUIRED)]
        );

        let row = valid_row(2).with_field("startDate", "01/11/2024");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![(Field::StartDate, messages::INVALID_START_DATE)]
        );
    }

    #[test]
    fn test_end_date_rules() {
        let row = valid_row(2).with_field("endDate", "2024-02-30");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![(Field::EndDate, messages::INVALID_END_DATE)]
        );

        let row = valid_row(5).with_field("endDate", "2024-10-01");
        let errors = validate_row(&row);
        assert_eq!(fields(&errors), vec![(Field::EndDate, messages::END_BEFORE_START)]);
        assert_eq!(errors[0].row_number, 5);

        // same day is fine
        let row = valid_row(2).with_field("endDate", "2024-11-01");
        assert!(validate_row(&row).is_empty());

        // blank end date is absent, not invalid
        let row = valid_row(2).with_field("endDate", " ");
        assert!(validate_row(&row).is_empty());
    }

    #[test]
    fn test_order_check_skipped_when_start_invalid() {
        let row = valid_row(2)
            .with_field("startDate", "2024-13-01")
            .with_field("endDate", "2024-01-01");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![(Field::StartDate, messages::INVALID_START_DATE)]
        );
    }

    #[test]
    fn test_invalid_numbers() {
        let row = valid_row(2)
            .with_field("spend", "muito")
            .with_field("leadsGenerated", "12,5")
            .with_field("conversions", "dez")
            .with_field("revenue", "n/a");

        assert_eq!(
            fields(&validate_row(&row)),
            vec![
                (Field::Spend, messages::INVALID_SPEND),
                (Field::LeadsGenerated, messages::INVALID_LEADS),
                (Field::Conversions, messages::INVALID_CONVERSIONS),
                (Field::Revenue, messages::INVALID_REVENUE),
            ]
        );
    }

    #[test]
    fn test_blank_numbers_are_zero() {
        let row = valid_row(2)
            .with_field("spend", "")
            .with_field("leadsGenerated", "")
            .with_field("conversions", "")
            .with_field("revenue", "");
        assert!(validate_row(&row).is_empty());
    }

    #[test]
    fn test_conversions_exceed_leads() {
        let row = valid_row(2)
            .with_field("leadsGenerated", "10")
            .with_field("conversions", "11");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![(Field::Conversions, messages::CONVERSIONS_EXCEED_LEADS)]
        );
    }

    #[test]
    fn test_cross_field_check_runs_after_parse_failure() {
        // leads fails to parse and falls back to 0, so 5 conversions exceed it
        let row = valid_row(2)
            .with_field("leadsGenerated", "abc")
            .with_field("conversions", "5");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![
                (Field::LeadsGenerated, messages::INVALID_LEADS),
                (Field::Conversions, messages::CONVERSIONS_EXCEED_LEADS),
            ]
        );
    }

    #[test]
    fn test_negative_spend() {
        let row = valid_row(2).with_field("spend", "-R$ 100,00");
        assert_eq!(fields(&validate_row(&row)), vec![(Field::Spend, messages::NEGATIVE_SPEND)]);
    }

    #[test]
    fn test_negative_revenue_and_counts() {
        let row = valid_row(2)
            .with_field("revenue", "-1")
            .with_field("leadsGenerated", "-3")
            .with_field("conversions", "-4");
        assert_eq!(
            fields(&validate_row(&row)),
            vec![
                (Field::LeadsGenerated, messages::NEGATIVE_LEADS),
                (Field::Conversions, messages::NEGATIVE_CONVERSIONS),
                (Field::Revenue, messages::NEGATIVE_REVENUE),
            ]
        );
    }

    #[test]
    fn test_validation_is_exhaustive() {
        let row = RawRow::new(7)
            .with_field("status", "x")
            .with_field("endDate", "ontem")
            .with_field("spend", "-5")
            .with_field("conversions", "2");

        assert_eq!(
            fields(&validate_row(&row)),
            vec![
                (Field::Name, messages::NAME_REQUIRED),
                (Field::Status, messages::INVALID_STATUS),
                (Field::StartDate, messages::START_DATE_REQUIRED),
                (Field::EndDate, messages::INVALID_END_DATE),
                (Field::Conversions, messages::CONVERSIONS_EXCEED_LEADS),
                (Field::Spend, messages::NEGATIVE_SPEND),
            ]
        );
    }

    #[test]
    fn test_validate_rows_keeps_row_order() {
        let rows = vec![
            valid_row(2).with_field("status", ""),
            valid_row(3),
            valid_row(4),
            valid_row(5).with_field("endDate", "2024-10-01"),
        ];
        let errors = validate_rows(&rows);

        assert_eq!(errors.len(), 2);
        assert_eq!((errors[0].row_number, errors[0].field), (2, Field::Status));
        assert_eq!((errors[1].row_number, errors[1].field), (5, Field::EndDate));
    }

    #[test]
    fn test_error_display_and_serialization() {
        let error = ValidationError::new(4, Field::StartDate, messages::INVALID_START_DATE);
        assert_eq!(error.to_string(), "Row 4: startDate - invalid start date");

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"rowNumber": 4, "field": "startDate", "message": "invalid start date"})
        );
    }
}
