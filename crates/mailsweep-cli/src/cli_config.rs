use std::path::{Path, PathBuf};

use mailsweep_core::{Error, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) imap: ImapSection,
    pub(crate) cleanup: CleanupSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ImapSection {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) tls: Option<bool>,
    pub(crate) skip_tls_verify: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CleanupSection {
    pub(crate) folders: Option<Vec<String>>,
    pub(crate) days: Option<u32>,
}

fn xdg_config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn config_path_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("mailsweep.toml"),
        xdg_config_dir().join("mailsweep").join("mailsweep.toml"),
    ]
}

fn load_config_text() -> Option<(PathBuf, String)> {
    for path in config_path_candidates() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            return Some((path, content));
        }
    }
    None
}

/// Reads `explicit` if given (it must exist), else the first default location that exists.
/// No file at all yields an empty config.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let (path, content) = match explicit {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
            (path.to_path_buf(), content)
        }
        None => match load_config_text() {
            Some(found) => found,
            None => {
                debug!("no config file found");
                return Ok(FileConfig::default());
            }
        },
    };
    debug!("loading config from {}", path.display());
    parse_file_config(&content).map_err(|e| match e {
        Error::Config(reason) => Error::Config(format!("{}: {}", path.display(), reason)),
        other => other,
    })
}

pub(crate) fn parse_file_config(content: &str) -> Result<FileConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mailsweep_core::Error;

    use super::{load_file_config, parse_file_config};

    #[test]
    fn full_config_parses() {
        let config = parse_file_config(
            r#"
[imap]
host = "imap.example.com"
port = 143
username = "me@example.com"
password = "secret"
tls = false
skip_tls_verify = true

[cleanup]
folders = ["INBOX", "Archive"]
days = 90
"#,
        )
        .unwrap();
        assert_eq!(config.imap.host.as_deref(), Some("imap.example.com"));
        assert_eq!(config.imap.port, Some(143));
        assert_eq!(config.imap.password.as_deref(), Some("secret"));
        assert_eq!(config.imap.tls, Some(false));
        assert_eq!(config.imap.skip_tls_verify, Some(true));
        assert_eq!(
            config.cleanup.folders,
            Some(vec!["INBOX".to_string(), "Archive".to_string()])
        );
        assert_eq!(config.cleanup.days, Some(90));
    }

    #[test]
    fn missing_tables_default_to_empty() {
        let config = parse_file_config("[imap]\nhost = \"mail.test\"\n").unwrap();
        assert_eq!(config.imap.host.as_deref(), Some("mail.test"));
        assert!(config.imap.username.is_none());
        assert!(config.cleanup.folders.is_none());
    }

    #[test]
    fn unknown_keys_and_bad_types_are_config_errors() {
        let err = parse_file_config("[imap]\nhots = \"typo\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 2);

        let err = parse_file_config("[cleanup]\ndays = \"thirty\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_path_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cleanup]\ndays = 7").unwrap();
        let config = load_file_config(Some(file.path())).unwrap();
        assert_eq!(config.cleanup.days, Some(7));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load_file_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::Config(ref reason) if reason.contains("absent.toml")));
    }

    #[test]
    fn malformed_file_names_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[imap\nhost = ").unwrap();
        let err = load_file_config(Some(file.path())).unwrap_err();
        let path = file.path().display().to_string();
        assert!(matches!(err, Error::Config(ref reason) if reason.contains(&path)));
    }
}
