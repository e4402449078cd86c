use async_trait::async_trait;

use crate::models::appointment::AppointmentRecord;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("login rejected with HTTP {0}")]
    Login(u16),

    #[error("unexpected page layout: {0}")]
    Layout(String),

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

/// One way of asking the booking site whether slots are open. The monitor
/// loop only cares whether the call succeeded.
#[async_trait]
pub trait AppointmentChecker: Send + Sync {
    async fn check(&self) -> Result<Vec<AppointmentRecord>, CheckError>;
}
