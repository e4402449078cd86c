use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_TIMEZONE: &str = "Africa/Casablanca";
pub const DEFAULT_LOGIN_URL: &str = "https://visa.vfsglobal.com/mar/fr/ita/login";
pub const DEFAULT_APPOINTMENT_URL: &str =
    "https://visa.vfsglobal.com/mar/fr/ita/book-an-appointment";
pub const DEFAULT_CENTER_NAME: &str = crate::service::message_service::DEFAULT_LOCATION;
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_LOG_FILE: &str = "vfs_monitor.log";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config line {line}: {content}")]
    Syntax { line: usize, content: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Raw `KEY=VALUE` pairs read from a dotenv-style file.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Fully resolved settings for one monitor process.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_base: String,
    pub vfs_email: String,
    pub vfs_password: String,
    pub vfs_login_url: String,
    pub vfs_appointment_url: String,
    pub center_name: String,
    pub check_interval: Duration,
    pub timezone: Tz,
    pub request_timeout: Option<Duration>,
    pub keep_alive_port: Option<u16>,
    pub log_file: PathBuf,
}

impl MonitorConfig {
    /// Resolves every setting through `get_prop`, which is expected to look in
    /// the config file first and the process environment second.
    pub fn from_lookup<F>(get_prop: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get_prop(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let check_interval = match get("CHECK_INTERVAL") {
            Some(raw) => Duration::from_secs(parse_positive("CHECK_INTERVAL", &raw)?),
            None => Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
        };
        let request_timeout = get("REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_positive("REQUEST_TIMEOUT_SECS", &raw).map(Duration::from_secs))
            .transpose()?;
        let keep_alive_port = get("KEEP_ALIVE_PORT")
            .map(|raw| {
                raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                    key: "KEEP_ALIVE_PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let timezone_name = get("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = timezone_name
            .trim()
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid {
                key: "TIMEZONE",
                value: timezone_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            telegram_api_base: get("TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            vfs_email: required("VFS_EMAIL")?,
            vfs_password: required("VFS_PASSWORD")?,
            vfs_login_url: get("VFS_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            vfs_appointment_url: get("VFS_APPOINTMENT_URL")
                .unwrap_or_else(|| DEFAULT_APPOINTMENT_URL.to_string()),
            center_name: get("VFS_CENTER_NAME").unwrap_or_else(|| DEFAULT_CENTER_NAME.to_string()),
            check_interval,
            timezone,
            request_timeout,
            keep_alive_port,
            log_file: log_file_from(&get_prop),
        })
    }
}

/// Log file location, resolvable before the rest of the config is validated
/// so that logging can start first.
pub fn log_file_from<F>(get_prop: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    get_prop("LOG_FILE")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "-10042"),
        ("VFS_EMAIL", "me@example.com"),
        ("VFS_PASSWORD", "hunter2"),
    ];

    #[test]
    fn parse_handles_comments_export_and_quotes() {
        let cfg = AppConfig::parse(
            "# comment\n\nexport TELEGRAM_CHAT_ID=\"-100\"\nVFS_EMAIL = 'a@b.c'\nEMPTY=\n",
        )
        .unwrap();
        assert_eq!(cfg.get("TELEGRAM_CHAT_ID").as_deref(), Some("-100"));
        assert_eq!(cfg.get("VFS_EMAIL").as_deref(), Some("a@b.c"));
        assert_eq!(cfg.get("EMPTY").as_deref(), Some(""));
        assert!(cfg.get("MISSING").is_none());
    }

    #[test]
    fn parse_rejects_line_without_equals() {
        let err = AppConfig::parse("GOOD=1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn defaults_apply_when_optional_keys_absent() {
        let config = MonitorConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.check_interval, Duration::from_secs(300));
        assert_eq!(config.timezone, chrono_tz::Africa::Casablanca);
        assert_eq!(config.center_name, DEFAULT_CENTER_NAME);
        assert_eq!(config.log_file, PathBuf::from("vfs_monitor.log"));
        assert!(config.request_timeout.is_none());
        assert!(config.keep_alive_port.is_none());
    }

    #[test]
    fn missing_required_key_is_reported_by_name() {
        let err = MonitorConfig::from_lookup(lookup(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("VFS_PASSWORD")));
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("TELEGRAM_BOT_TOKEN", "  ");
        let err = MonitorConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CHECK_INTERVAL", "0"));
        let err = MonitorConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHECK_INTERVAL", .. }));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TIMEZONE", "Mars/Olympus"));
        let err = MonitorConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TIMEZONE", .. }));
    }

    #[test]
    fn optional_overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("CHECK_INTERVAL", "60"),
            ("TIMEZONE", "Europe/Rome"),
            ("REQUEST_TIMEOUT_SECS", "20"),
            ("KEEP_ALIVE_PORT", "8080"),
            ("LOG_FILE", "/tmp/monitor.log"),
        ]);
        let config = MonitorConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.timezone, chrono_tz::Europe::Rome);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(20)));
        assert_eq!(config.keep_alive_port, Some(8080));
        assert_eq!(config.log_file, PathBuf::from("/tmp/monitor.log"));
    }
}
