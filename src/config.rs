//! Configuration for the CLI.
//!
//! Two sources feed the command line:
//!
//! 1. A `.env` file in the local data directory holding the session
//!    credentials (`CHOSIC_COOKIE`, `CHOSIC_X_WP_NONCE`, `CHOSIC_APP`) and an
//!    optional `CHOSIC_BASE_URL`. Variables already set in the environment
//!    take precedence over the file.
//! 2. A `.chosicrc` file with default flag values, looked up in the working
//!    directory first and then in the home directory. Flags given on the
//!    command line always win.
//!
//! The library itself never reads either source; the CLI passes the values
//! on explicitly.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info};

use crate::{chosic::Credentials, error::ConfigError};

pub const APP_DIR: &str = "chosicli";
pub const RC_FILE: &str = ".chosicrc";

/// Path of the `.env` file.
///
/// - Linux: `~/.local/share/chosicli/.env`
/// - macOS: `~/Library/Application Support/chosicli/.env`
/// - Windows: `%LOCALAPPDATA%/chosicli/.env`
pub fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push(".env");
    path
}

/// Loads the `.env` file from the local data directory, creating the
/// directory if needed. A missing file is not an error since every value in
/// it is optional.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = env_file_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    if !path.is_file() {
        debug!(path = %path.display(), "no .env file");
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|_| ConfigError::Parse {
        path: path.clone(),
        line: 0,
    })?;
    debug!(path = %path.display(), ".env loaded");
    Ok(())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Session credentials from `CHOSIC_COOKIE`, `CHOSIC_X_WP_NONCE` and
/// `CHOSIC_APP`. Unset or empty variables are left out.
pub fn credentials_from_env() -> Credentials {
    Credentials {
        cookie: non_empty_var("CHOSIC_COOKIE"),
        nonce: non_empty_var("CHOSIC_X_WP_NONCE"),
        app: non_empty_var("CHOSIC_APP"),
    }
}

pub fn base_url_from_env() -> Option<String> {
    non_empty_var("CHOSIC_BASE_URL")
}

/// Defaults read from `.chosicrc`. Every field is optional; `None` means the
/// built-in default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcDefaults {
    pub limit: Option<u32>,
    pub page_size: Option<u32>,
    pub fetch_all: Option<bool>,
    pub out: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub overwrite: Option<bool>,
    pub timeout: Option<Duration>,
    pub verbose: Option<bool>,
    pub quiet: Option<bool>,
}

/// Reads the first `.chosicrc` found in `./` or `~/`. Returns the defaults
/// when neither exists.
pub async fn load_rc() -> Result<RcDefaults, ConfigError> {
    let mut candidates = vec![PathBuf::from(RC_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(RC_FILE));
    }

    for path in candidates {
        if !path.is_file() {
            continue;
        }

        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

        let rc = parse_rc(&content, &path)?;
        info!(path = %path.display(), "configuration loaded");
        return Ok(rc);
    }

    debug!("no {} found", RC_FILE);
    Ok(RcDefaults::default())
}

/// Parses INI-style `key = value` lines. `[section]` headers are accepted and
/// ignored, as are blank lines and lines starting with `#` or `;`. Unknown
/// keys are skipped.
pub fn parse_rc(content: &str, path: &Path) -> Result<RcDefaults, ConfigError> {
    let mut rc = RcDefaults::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }

        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
            });
        };

        let key = key.trim().to_lowercase().replace('-', "_");
        let value = value.trim();

        match key.as_str() {
            "limit" => rc.limit = Some(parse_number(&key, value)?),
            "page_size" => rc.page_size = Some(parse_number(&key, value)?),
            "concurrency" => rc.concurrency = Some(parse_number(&key, value)?),
            "timeout" => {
                let secs: f64 = parse_number(&key, value)?;
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(invalid(&key, value));
                }
                rc.timeout = Some(Duration::from_secs_f64(secs));
            }
            "fetch_all" => rc.fetch_all = Some(parse_bool(&key, value)?),
            "overwrite" => rc.overwrite = Some(parse_bool(&key, value)?),
            "verbose" => rc.verbose = Some(parse_bool(&key, value)?),
            "quiet" => rc.quiet = Some(parse_bool(&key, value)?),
            "out" if !value.is_empty() => rc.out = Some(PathBuf::from(value)),
            _ => debug!(%key, "ignoring unknown setting"),
        }
    }

    Ok(rc)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rc_sections_and_comments() {
        let content = "\
# defaults
[search]
limit = 20
page_size = 30
fetch_all = yes
out = ./downloads
concurrency = 3

; logging
[logging]
verbose = false

[api]
timeout = 2.5
unknown_key = whatever
";
        let rc = parse_rc(content, Path::new(".chosicrc")).unwrap();

        assert_eq!(rc.limit, Some(20));
        assert_eq!(rc.page_size, Some(30));
        assert_eq!(rc.fetch_all, Some(true));
        assert_eq!(rc.out, Some(PathBuf::from("./downloads")));
        assert_eq!(rc.concurrency, Some(3));
        assert_eq!(rc.verbose, Some(false));
        assert_eq!(rc.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(rc.overwrite, None);
    }

    #[test]
    fn test_parse_rc_reports_line_and_bad_values() {
        let err = parse_rc("limit = 5\nnot a setting\n", Path::new("rc")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));

        let err = parse_rc("limit = many", Path::new("rc")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "limit"));

        let err = parse_rc("overwrite = maybe", Path::new("rc")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
