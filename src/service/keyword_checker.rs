use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};

use crate::clients::vfs_client::VfsSession;
use crate::models::appointment::{AppointmentRecord, Confidence};
use crate::service::checker::{AppointmentChecker, CheckError};

pub const SOURCE_LABEL: &str = "Keyword scan";
pub const UNDATED_NOTE: &str =
    "Availability keywords found but no date could be extracted. Verify manually on the website.";

const MAX_DATED_RECORDS: usize = 5;

const NO_SLOT_PHRASES: &[&str] = &[
    "no appointment slots",
    "no slots available",
    "no appointments available",
    "no appointment available",
    "no available slots",
    "no available appointments",
    "currently no date",
    "aucun créneau",
    "pas de créneau",
    "aucun rendez-vous disponible",
    "aucune disponibilité",
];

const AVAILABILITY_PHRASES: &[&str] = &[
    "appointment available",
    "appointments available",
    "slots available",
    "available slots",
    "earliest available",
    "book now",
    "créneaux disponibles",
    "créneau disponible",
    "rendez-vous disponible",
];

/// Words that cancel an availability phrase when they appear shortly before
/// it in the same sentence.
const NEGATIONS: &[&str] = &["no", "not", "none", "without", "aucun", "aucune", "pas", "sans"];
const NEGATION_WINDOW: usize = 3;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4})\b").expect("date pattern compiles")
});

/// Fallback strategy: ignores the page structure and looks for tell-tale
/// wording instead. Login trouble is tolerated since some of the portal's
/// pages render without a session.
pub struct KeywordScanChecker {
    session: VfsSession,
    center_name: String,
}

impl KeywordScanChecker {
    pub fn new(session: VfsSession, center_name: impl Into<String>) -> Self {
        Self {
            session,
            center_name: center_name.into(),
        }
    }
}

#[async_trait]
impl AppointmentChecker for KeywordScanChecker {
    async fn check(&self) -> Result<Vec<AppointmentRecord>, CheckError> {
        if let Err(err) = self.session.login().await {
            warn!(error = %err, "keyword scan continuing without a session");
        }
        let page = self.session.fetch_appointment_page().await?;
        let found = scan_page(&page.html, &self.center_name);
        debug!(found = found.len(), "keyword scan finished");
        Ok(found)
    }
}

fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(chunk) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| {
                parent
                    .value()
                    .as_element()
                    .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
            })
            .unwrap_or(false);
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    text
}

fn negated_before(prefix: &str) -> bool {
    let sentence = match prefix.rfind(['.', '!', '?', ';']) {
        Some(idx) => &prefix[idx + 1..],
        None => prefix,
    };
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .rev()
        .take(NEGATION_WINDOW)
        .any(|word| NEGATIONS.contains(&word))
}

fn affirms_availability(lowered: &str) -> bool {
    AVAILABILITY_PHRASES.iter().any(|phrase| {
        lowered
            .match_indices(phrase)
            .any(|(idx, _)| !negated_before(&lowered[..idx]))
    })
}

fn is_real_date(candidate: &str) -> bool {
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d").is_ok()
        || NaiveDate::parse_from_str(candidate, "%d/%m/%Y").is_ok()
}

pub fn scan_page(html: &str, default_location: &str) -> Vec<AppointmentRecord> {
    let document = Html::parse_document(html);
    let text = visible_text(&document);
    let lowered = text.to_lowercase();

    if NO_SLOT_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return Vec::new();
    }
    if !affirms_availability(&lowered) {
        return Vec::new();
    }

    let mut dates: Vec<&str> = Vec::new();
    for found in DATE_PATTERN.find_iter(&text) {
        let candidate = found.as_str();
        if is_real_date(candidate) && !dates.contains(&candidate) {
            dates.push(candidate);
        }
        if dates.len() == MAX_DATED_RECORDS {
            break;
        }
    }

    let base = AppointmentRecord {
        location: Some(default_location.to_string()),
        source: Some(SOURCE_LABEL.to_string()),
        ..AppointmentRecord::default()
    };

    if dates.is_empty() {
        return vec![AppointmentRecord {
            confidence: Some(Confidence::Low),
            note: Some(UNDATED_NOTE.to_string()),
            ..base
        }];
    }

    dates
        .into_iter()
        .map(|date| AppointmentRecord {
            date: Some(date.to_string()),
            confidence: Some(Confidence::Medium),
            ..base.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_wording_wins_over_positive() {
        let html = "<body><p>No slots available at this time.</p></body>";
        assert!(scan_page(html, "Rabat").is_empty());

        let html = "<body><p>Aucun rendez-vous disponible</p></body>";
        assert!(scan_page(html, "Rabat").is_empty());
    }

    #[test]
    fn negated_availability_phrases_are_not_hits() {
        let pages = [
            "<body><p>Sorry, there are no available slots at the moment.</p></body>",
            "<body><p>There are currently no available appointments.</p></body>",
            "<body><p>This week the centre is without slots available.</p></body>",
            "<body><p>Slots are not available for this category.</p></body>",
            "<body><p>Il n'y a pas de créneaux disponibles.</p></body>",
            "<body><p>Sans rendez-vous disponible pour le moment.</p></body>",
        ];
        for html in pages {
            assert!(scan_page(html, "Rabat").is_empty(), "false hit for {html}");
        }
    }

    #[test]
    fn negation_does_not_reach_across_sentences() {
        let html = "<body><p>No fees apply.</p><p>Appointments available on 2024-05-01</p></body>";
        let found = scan_page(html, "Rabat");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn page_without_any_keyword_is_empty() {
        let html = "<body><h1>Welcome</h1><p>Please select a category.</p></body>";
        assert!(scan_page(html, "Rabat").is_empty());
    }

    #[test]
    fn dated_availability_yields_one_record_per_distinct_date() {
        let html = r#"<body>
            <p>Earliest available slot: 2024-05-01</p>
            <p>Also 02/05/2024 and again 2024-05-01</p>
            <p>Ignore 2024-13-40</p>
        </body>"#;
        let found = scan_page(html, "Rabat");
        let dates: Vec<_> = found.iter().filter_map(|r| r.date.as_deref()).collect();
        assert_eq!(dates, vec!["2024-05-01", "02/05/2024"]);
        assert!(found.iter().all(|r| r.confidence == Some(Confidence::Medium)));
        assert!(found.iter().all(|r| r.location.as_deref() == Some("Rabat")));
    }

    #[test]
    fn undated_availability_is_low_confidence_with_note() {
        let html = "<body><button>Book now</button></body>";
        let found = scan_page(html, "Rabat");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, Some(Confidence::Low));
        assert_eq!(found[0].note.as_deref(), Some(UNDATED_NOTE));
        assert!(found[0].date.is_none());
    }

    #[test]
    fn script_contents_are_ignored() {
        let html = r#"<body><script>var msg = "slots available";</script><p>Hello</p></body>"#;
        assert!(scan_page(html, "Rabat").is_empty());
    }
}
