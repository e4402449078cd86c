use serde::{Deserialize, Serialize};

/// How sure a checker is that a slot is really bookable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn marker(self) -> &'static str {
        match self {
            Confidence::Low => "🔴",
            Confidence::Medium => "🟡",
            Confidence::High => "🟢",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

/// One discovered slot. Checkers fill in whatever they could extract; every
/// field may be missing and the formatter supplies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentRecord {
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub link: Option<String>,
    pub confidence: Option<Confidence>,
    pub source: Option<String>,
    pub note: Option<String>,
}

/// Treats blank strings the same as absent ones.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
