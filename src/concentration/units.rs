//! Concentration units and conversion constants
//!
//! All calculations run in ng/µL. The multipliers below are the fixed table the
//! calculator has always used, not a derivation from SI prefixes.

use serde::{Deserialize, Serialize};

/// A supported concentration unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    #[default]
    #[serde(rename = "ng/µL")]
    NgPerUl,
    #[serde(rename = "µg/mL")]
    UgPerMl,
    #[serde(rename = "mg/mL")]
    MgPerMl,
}

impl ConcentrationUnit {
    pub const ALL: [ConcentrationUnit; 3] = [
        ConcentrationUnit::NgPerUl,
        ConcentrationUnit::UgPerMl,
        ConcentrationUnit::MgPerMl,
    ];

    /// Canonical display tag, as shown in the unit selector
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcentrationUnit::NgPerUl => "ng/µL",
            ConcentrationUnit::UgPerMl => "µg/mL",
            ConcentrationUnit::MgPerMl => "mg/mL",
        }
    }

    /// Parse a unit tag
    ///
    /// Case-insensitive; accepts the micro sign, the Greek mu and a plain `u`.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = normalize_tag(s);
        match normalized.as_str() {
            "ng/ul" | "ng/microliter" => Some(ConcentrationUnit::NgPerUl),
            "ug/ml" | "mcg/ml" | "microgram/ml" => Some(ConcentrationUnit::UgPerMl),
            "mg/ml" | "milligram/ml" => Some(ConcentrationUnit::MgPerMl),
            _ => None,
        }
    }

    /// Multiplier taking a value in this unit to ng/µL
    pub fn ng_per_ul_factor(&self) -> f64 {
        match self {
            ConcentrationUnit::NgPerUl => 1.0,
            ConcentrationUnit::UgPerMl => NG_PER_UL_PER_UG_PER_ML,
            ConcentrationUnit::MgPerMl => NG_PER_UL_PER_MG_PER_ML,
        }
    }
}

impl std::fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversion Constants (to ng/µL)
// ============================================================================

/// ng/µL per µg/mL
pub const NG_PER_UL_PER_UG_PER_ML: f64 = 1_000.0;
/// ng/µL per mg/mL
pub const NG_PER_UL_PER_MG_PER_ML: f64 = 1_000_000.0;

/// Base unit every calculation is carried out in
pub const BASE_UNIT: ConcentrationUnit = ConcentrationUnit::NgPerUl;

// ============================================================================
// Unit Recognition
// ============================================================================

fn normalize_tag(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'µ' | 'μ' => 'u',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Get the conversion factor to ng/µL for a unit tag, if the tag is recognized
pub fn ng_per_ul_factor(unit: &str) -> Option<f64> {
    ConcentrationUnit::parse(unit).map(|u| u.ng_per_ul_factor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_tags() {
        assert_eq!(ConcentrationUnit::parse("ng/µL"), Some(ConcentrationUnit::NgPerUl));
        assert_eq!(ConcentrationUnit::parse("µg/mL"), Some(ConcentrationUnit::UgPerMl));
        assert_eq!(ConcentrationUnit::parse("mg/mL"), Some(ConcentrationUnit::MgPerMl));
    }

    #[test]
    fn test_parse_aliases() {
        // Greek mu (U+03BC) rather than the micro sign
        assert_eq!(ConcentrationUnit::parse("μg/mL"), Some(ConcentrationUnit::UgPerMl));
        assert_eq!(ConcentrationUnit::parse("ug/ml"), Some(ConcentrationUnit::UgPerMl));
        assert_eq!(ConcentrationUnit::parse(" NG/UL "), Some(ConcentrationUnit::NgPerUl));
        assert_eq!(ConcentrationUnit::parse("mg / mL"), Some(ConcentrationUnit::MgPerMl));
        assert_eq!(ConcentrationUnit::parse("g/L"), None);
        assert_eq!(ConcentrationUnit::parse(""), None);
    }

    #[test]
    fn test_as_str_parses_back() {
        for unit in ConcentrationUnit::ALL {
            assert_eq!(ConcentrationUnit::parse(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn test_ng_per_ul_factor() {
        assert_eq!(ng_per_ul_factor("ng/µL"), Some(1.0));
        assert_eq!(ng_per_ul_factor("µg/mL"), Some(NG_PER_UL_PER_UG_PER_ML));
        assert_eq!(ng_per_ul_factor("mg/mL"), Some(NG_PER_UL_PER_MG_PER_ML));
        assert_eq!(ng_per_ul_factor("unknown"), None);
    }

    #[test]
    fn test_serde_uses_display_tags() {
        let json = serde_json::to_string(&ConcentrationUnit::UgPerMl).unwrap();
        assert_eq!(json, "\"µg/mL\"");
        let back: ConcentrationUnit = serde_json::from_str("\"mg/mL\"").unwrap();
        assert_eq!(back, ConcentrationUnit::MgPerMl);
    }
}
