// Header Mapper
// Canonicalizes free-form column headers ("Campanha", "INVESTIMENTO",
// "Data Início") into the fixed internal field set.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

/// Fixed internal identifier for a data column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Status,
    StartDate,
    EndDate,
    Spend,
    LeadsGenerated,
    Conversions,
    Revenue,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Status,
        Field::StartDate,
        Field::EndDate,
        Field::Spend,
        Field::LeadsGenerated,
        Field::Conversions,
        Field::Revenue,
    ];

    /// Canonical field name as it appears in rows and error reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Status => "status",
            Field::StartDate => "startDate",
            Field::EndDate => "endDate",
            Field::Spend => "spend",
            Field::LeadsGenerated => "leadsGenerated",
            Field::Conversions => "conversions",
            Field::Revenue => "revenue",
        }
    }

    /// Inverse of [`Field::as_str`]
    pub fn from_canonical(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SYNONYM TABLE
// ============================================================================

/// Normalized header spelling -> canonical field.
/// Keys are already lowercased, accent-free and underscored.
const HEADER_SYNONYMS: &[(&str, Field)] = &[
    // name
    ("name", Field::Name),
    ("nome", Field::Name),
    ("campanha", Field::Name),
    ("nome_campanha", Field::Name),
    ("nome_da_campanha", Field::Name),
    ("campaign", Field::Name),
    ("campaign_name", Field::Name),
    // status
    ("status", Field::Status),
    ("situacao", Field::Status),
    // startDate
    ("startdate", Field::StartDate),
    ("start_date", Field::StartDate),
    ("data", Field::StartDate),
    ("inicio", Field::StartDate),
    ("data_inicio", Field::StartDate),
    ("data_de_inicio", Field::StartDate),
    // endDate
    ("enddate", Field::EndDate),
    ("end_date", Field::EndDate),
    ("fim", Field::EndDate),
    ("data_fim", Field::EndDate),
    ("data_de_fim", Field::EndDate),
    ("termino", Field::EndDate),
    // spend
    ("spend", Field::Spend),
    ("gasto", Field::Spend),
    ("gasto_total", Field::Spend),
    ("investimento", Field::Spend),
    ("custo", Field::Spend),
    // leadsGenerated
    ("leads", Field::LeadsGenerated),
    ("leadsgenerated", Field::LeadsGenerated),
    ("leads_generated", Field::LeadsGenerated),
    ("leads_gerados", Field::LeadsGenerated),
    // conversions
    ("conversions", Field::Conversions),
    ("conversoes", Field::Conversions),
    ("vendas", Field::Conversions),
    // revenue
    ("revenue", Field::Revenue),
    ("receita", Field::Revenue),
    ("receita_gerada", Field::Revenue),
    ("faturamento", Field::Revenue),
];

// ============================================================================
// MAPPING
// ============================================================================

/// Lowercase, trim, strip diacritics and collapse whitespace runs into `_`
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Canonical field for a header, if any synonym matches
pub fn lookup_field(raw: &str) -> Option<Field> {
    let normalized = normalize_header(raw);
    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == normalized)
        .map(|(_, field)| *field)
}

/// Canonical field name, or the normalized header when nothing matches.
/// Unrecognized columns pass through and are ignored by the validator.
pub fn map_header(raw: &str) -> String {
    match lookup_field(raw) {
        Some(field) => field.as_str().to_string(),
        None => normalize_header(raw),
    }
}

// Combining diacritical marks (U+0300..U+036F) left behind by NFD
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_synonyms() {
        assert_eq!(map_header("Campanha"), "name");
        assert_eq!(map_header("campanha"), "name");
        assert_eq!(map_header("CAMPANHA"), "name");
    }

    #[test]
    fn test_accents_are_stripped() {
        assert_eq!(map_header("Conversões"), "conversions");
        assert_eq!(map_header("Data Início"), "startDate");
        assert_eq!(map_header("Situação"), "status");
        // decomposed form: "o" + combining tilde
        assert_eq!(map_header("Converso\u{0303}es"), "conversions");
    }

    #[test]
    fn test_any_latin_diacritic_is_stripped() {
        assert_eq!(map_header("Gastọ"), "spend");
        assert_eq!(map_header("Receitǎ"), "revenue");
        assert_eq!(map_header("Fǐm"), "endDate");
        assert_eq!(map_header("TÉRMINO"), "endDate");
    }

    #[test]
    fn test_whitespace_collapses_to_underscore() {
        assert_eq!(normalize_header("  Gasto \t  Total "), "gasto_total");
        assert_eq!(map_header("Gasto   Total"), "spend");
        assert_eq!(map_header("Leads Gerados"), "leadsGenerated");
    }

    #[test]
    fn test_portuguese_synonyms() {
        assert_eq!(map_header("Investimento"), "spend");
        assert_eq!(map_header("gasto"), "spend");
        assert_eq!(map_header("Leads"), "leadsGenerated");
        assert_eq!(map_header("Receita"), "revenue");
        assert_eq!(map_header("Faturamento"), "revenue");
        assert_eq!(map_header("Inicio"), "startDate");
        assert_eq!(map_header("Data"), "startDate");
        assert_eq!(map_header("Fim"), "endDate");
        assert_eq!(map_header("Nome"), "name");
    }

    #[test]
    fn test_canonical_names_map_to_themselves() {
        for field in Field::ALL {
            assert_eq!(map_header(field.as_str()), field.as_str());
            assert_eq!(Field::from_canonical(field.as_str()), Some(field));
        }
    }

    #[test]
    fn test_unknown_header_passes_through_normalized() {
        assert_eq!(map_header("Canal de Aquisição"), "canal_de_aquisicao");
        assert_eq!(lookup_field("Canal"), None);
    }

    #[test]
    fn test_field_serializes_camel_case() {
        let json = serde_json::to_string(&Field::LeadsGenerated).unwrap();
        assert_eq!(json, "\"leadsGenerated\"");
    }
}
