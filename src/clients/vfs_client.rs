use std::fmt;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

use crate::service::checker::CheckError;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PortalEndpoints {
    pub login_url: String,
    pub appointment_url: String,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub html: String,
}

/// Cookie-backed HTTP session against the booking portal.
pub struct VfsSession {
    http: reqwest::Client,
    credentials: Credentials,
    endpoints: PortalEndpoints,
}

impl VfsSession {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(
        credentials: Credentials,
        endpoints: PortalEndpoints,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            credentials,
            endpoints,
        })
    }

    pub async fn login(&self) -> Result<(), CheckError> {
        let url = &self.endpoints.login_url;
        debug!(email = %self.credentials.email, "logging in to booking portal");
        let response = self
            .http
            .post(url)
            .form(&[
                ("email", self.credentials.email.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| CheckError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Login(status.as_u16()));
        }
        Ok(())
    }

    pub async fn fetch_appointment_page(&self) -> Result<FetchedPage, CheckError> {
        let url = &self.endpoints.appointment_url;
        let http_err = |source| CheckError::Http {
            url: url.clone(),
            source,
        };
        let response = self.http.get(url).send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().clone();
        let html = response.text().await.map_err(http_err)?;
        debug!(url = %final_url, bytes = html.len(), "fetched appointment page");
        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }
}
