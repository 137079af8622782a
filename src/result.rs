use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::stats::StatsAccumulator;
use crate::model::validation::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Yes,
    No,
    /// The check does not apply to this entity's roles.
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl Presence {
    pub fn from_bool(present: bool) -> Self {
        if present {
            Presence::Yes
        } else {
            Presence::No
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Presence::Yes => write!(f, "Yes"),
            Presence::No => write!(f, "No"),
            Presence::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Validation columns of a detail row.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UrlCheck {
    /// Validation was off, the entity is not an SP, it has no privacy URL,
    /// or the validator returned nothing for it.
    NotChecked,
    Checked(ValidationResult),
}

impl UrlCheck {
    pub fn status_label(&self) -> String {
        match self {
            UrlCheck::NotChecked => "not checked".to_string(),
            UrlCheck::Checked(r) if r.accessible => format!("OK ({})", r.status_code),
            UrlCheck::Checked(r) => match r.error {
                Some(ref e) => e.clone(),
                None => format!("HTTP {}", r.status_code),
            },
        }
    }
}

/// One output line per identified entity.
#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub federation: String,
    pub role: String,
    pub org_name: String,
    pub entity_id: String,
    pub privacy: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_url: Option<String>,
    pub security: Presence,
    pub sirtfi: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_check: Option<UrlCheck>,
}

/// Everything one analysis pass produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub rows: Vec<DetailRow>,
    pub global: StatsAccumulator,
    pub federations: BTreeMap<String, StatsAccumulator>,
    pub validated: bool,
}
