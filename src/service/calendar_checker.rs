use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::clients::vfs_client::VfsSession;
use crate::models::appointment::{AppointmentRecord, Confidence};
use crate::service::checker::{AppointmentChecker, CheckError};

pub const SOURCE_LABEL: &str = "Calendar scan";

const CALENDAR_SELECTOR: &str =
    "#appointment-calendar, .appointment-calendar, [data-role=\"calendar\"]";
const SLOT_SELECTOR: &str = ".available-slot, td.available, [data-available=\"true\"]";
const SLOT_DATE_SELECTOR: &str = ".slot-date";
const SLOT_TIME_SELECTOR: &str = ".slot-time";
const LINK_SELECTOR: &str = "a[href]";

/// Primary strategy: log in and read open slots straight out of the
/// booking calendar markup. Any change to that markup surfaces as
/// `CheckError::Layout`.
pub struct PortalCalendarChecker {
    session: VfsSession,
    center_name: String,
}

impl PortalCalendarChecker {
    pub fn new(session: VfsSession, center_name: impl Into<String>) -> Self {
        Self {
            session,
            center_name: center_name.into(),
        }
    }
}

#[async_trait]
impl AppointmentChecker for PortalCalendarChecker {
    async fn check(&self) -> Result<Vec<AppointmentRecord>, CheckError> {
        self.session.login().await?;
        let page = self.session.fetch_appointment_page().await?;
        let slots = parse_calendar(&page.html, &page.url, &self.center_name)?;
        debug!(slots = slots.len(), "calendar scan finished");
        Ok(slots)
    }
}

fn selector(raw: &str) -> Result<Selector, CheckError> {
    Selector::parse(raw).map_err(|e| CheckError::Selector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text sitting directly inside `element`, ignoring nested child elements.
fn own_text(element: &ElementRef<'_>) -> Option<String> {
    let text = element
        .children()
        .filter_map(|node| node.value().as_text())
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");
    Some(text).filter(|t| !t.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn child_text(element: &ElementRef<'_>, child: &Selector) -> Option<String> {
    element
        .select(child)
        .next()
        .map(|el| collapsed_text(&el))
        .filter(|text| !text.is_empty())
}

pub fn parse_calendar(
    html: &str,
    page_url: &Url,
    default_location: &str,
) -> Result<Vec<AppointmentRecord>, CheckError> {
    let document = Html::parse_document(html);
    let calendar_sel = selector(CALENDAR_SELECTOR)?;
    let slot_sel = selector(SLOT_SELECTOR)?;
    let date_sel = selector(SLOT_DATE_SELECTOR)?;
    let time_sel = selector(SLOT_TIME_SELECTOR)?;
    let link_sel = selector(LINK_SELECTOR)?;

    let calendars: Vec<ElementRef<'_>> = document.select(&calendar_sel).collect();
    if calendars.is_empty() {
        return Err(CheckError::Layout(
            "appointment calendar not found on page".to_string(),
        ));
    }

    let mut appointments = Vec::new();
    for calendar in calendars {
        for slot in calendar.select(&slot_sel) {
            let attrs = slot.value();
            let date = non_empty(attrs.attr("data-date"))
                .or_else(|| child_text(&slot, &date_sel))
                .or_else(|| own_text(&slot));
            let time =
                non_empty(attrs.attr("data-time")).or_else(|| child_text(&slot, &time_sel));
            let link = slot
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| {
                    page_url
                        .join(href)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| href.to_string())
                });
            let location = non_empty(attrs.attr("data-center"))
                .unwrap_or_else(|| default_location.to_string());

            appointments.push(AppointmentRecord {
                location: Some(location),
                date,
                time,
                link,
                confidence: Some(Confidence::High),
                source: Some(SOURCE_LABEL.to_string()),
                note: None,
            });
        }
    }
    Ok(appointments)
}
