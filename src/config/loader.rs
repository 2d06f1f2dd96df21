//! Load configuration from `.env`, an optional `appsettings.json`, and process environment.

use crate::config::types::*;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REGISTRATION_TIMEOUT_SECS: u64 = 10;

/// Load `.env` (if any), then the settings file at `path` (optional, like the
/// original service), then apply environment overrides and validate.
pub fn load(path: &Path) -> Result<ServiceConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let file = read_settings_file(path)?;
    from_sources(file, |key| std::env::var(key).ok())
}

/// Missing file yields defaults; unreadable or malformed file is an error.
pub fn read_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using environment only");
            return Ok(SettingsFile::default());
        }
        Err(e) => return Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
    };
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Merge file values with overrides from `env` and validate the result.
pub fn from_sources<F>(file: SettingsFile, env: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let service_name = env("SERVICE_NAME")
        .or(file.service_name)
        .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
    if service_name.trim().is_empty() {
        return Err(ConfigError::Missing("SERVICE_NAME"));
    }

    let database_url = env("DATABASE_URL").unwrap_or(file.connection_strings.local);
    if database_url.trim().is_empty() {
        return Err(ConfigError::Missing("ConnectionStrings.local / DATABASE_URL"));
    }

    let listen_raw = env("LISTEN_ADDR")
        .or(file.listen_addr)
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let listen_addr: SocketAddr = listen_raw.parse().map_err(|e| ConfigError::Invalid {
        key: "LISTEN_ADDR",
        message: format!("{}: {}", listen_raw, e),
    })?;

    let white_label_address = env("WHITE_LABEL_ADDRESS")
        .or(file.root_addresses.white_label)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let mut database = file.database;
    if let Some(raw) = env("DATABASE_MAX_CONNECTIONS") {
        database.max_connections = parse_number("DATABASE_MAX_CONNECTIONS", &raw)?;
    }
    if database.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "DATABASE_MAX_CONNECTIONS",
            message: "must be at least 1".into(),
        });
    }

    let timeout_secs = match env("REGISTRATION_TIMEOUT_SECS") {
        Some(raw) => parse_number("REGISTRATION_TIMEOUT_SECS", &raw)?,
        None => file
            .registration_timeout_secs
            .unwrap_or(DEFAULT_REGISTRATION_TIMEOUT_SECS),
    };
    if timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            key: "REGISTRATION_TIMEOUT_SECS",
            message: "must be at least 1".into(),
        });
    }

    Ok(ServiceConfig {
        service_name,
        listen_addr,
        database_url,
        white_label_address,
        database,
        registration_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("{}: {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn appsettings() -> SettingsFile {
        serde_json::from_str(
            r#"{
                "ConnectionStrings": { "local": "postgres://localhost/comments" },
                "RootAddresses": { "WhiteLabel": "http://directory:6041" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn file_values_with_defaults() {
        let config = from_sources(appsettings(), env_of(&[])).unwrap();
        assert_eq!(config.service_name, "Comment");
        assert_eq!(config.database_url, "postgres://localhost/comments");
        assert_eq!(config.white_label_address.as_deref(), Some("http://directory:6041"));
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.registration_timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_overrides_file() {
        let config = from_sources(
            appsettings(),
            env_of(&[
                ("DATABASE_URL", "postgres://db/other"),
                ("WHITE_LABEL_ADDRESS", "http://elsewhere"),
                ("LISTEN_ADDR", "127.0.0.1:8080"),
                ("REGISTRATION_TIMEOUT_SECS", "3"),
                ("DATABASE_MAX_CONNECTIONS", "12"),
            ]),
        )
        .unwrap();
        assert_eq!(config.database_url, "postgres://db/other");
        assert_eq!(config.white_label_address.as_deref(), Some("http://elsewhere"));
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.registration_timeout, Duration::from_secs(3));
        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn blank_directory_address_means_not_configured() {
        let config = from_sources(appsettings(), env_of(&[("WHITE_LABEL_ADDRESS", "  ")])).unwrap();
        assert!(config.white_label_address.is_none());
    }

    #[test]
    fn missing_connection_string_is_rejected() {
        let err = from_sources(SettingsFile::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = from_sources(appsettings(), env_of(&[("REGISTRATION_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "REGISTRATION_TIMEOUT_SECS", .. }));
        let err = from_sources(appsettings(), env_of(&[("REGISTRATION_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = from_sources(appsettings(), env_of(&[("LISTEN_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LISTEN_ADDR", .. }));
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let file = read_settings_file(Path::new("/definitely/not/here/appsettings.json")).unwrap();
        assert!(file.connection_strings.local.is_empty());
        assert!(file.root_addresses.white_label.is_none());
    }
}
