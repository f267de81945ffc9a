use mailsweep_core::{Error, Result, Selection, TimeWindow};
use mailsweep_mail::ImapConfig;

use super::{Cli, FileConfig};

const DEFAULT_PORT: u16 = 993;
const DEFAULT_DAYS: u32 = 30;
const DEFAULT_FOLDER: &str = "INBOX";

/// Command line merged over the config file, validated before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) use_tls: bool,
    pub(crate) skip_tls_verify: bool,
    pub(crate) folders: Vec<String>,
    pub(crate) selection: Selection,
    pub(crate) dry_run: bool,
    pub(crate) list_folders: bool,
}

impl Settings {
    pub(crate) fn imap_config(&self, password: String) -> ImapConfig {
        ImapConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password,
            use_tls: self.use_tls,
            skip_tls_verify: self.skip_tls_verify,
        }
    }
}

pub(crate) fn resolve_settings(cli: &Cli, file: FileConfig) -> Result<Settings> {
    let FileConfig { imap, cleanup } = file;
    let host = cli.server.clone().or(imap.host).ok_or_else(|| {
        Error::InvalidArgument("--server is required (or set host under [imap])".to_string())
    })?;
    let username = cli.username.clone().or(imap.username).ok_or_else(|| {
        Error::InvalidArgument("--username is required (or set username under [imap])".to_string())
    })?;

    let folders = match (&cli.folders, &cli.folder) {
        (Some(folders), _) => folders.clone(),
        (None, Some(folder)) => vec![folder.clone()],
        (None, None) => cleanup
            .folders
            .unwrap_or_else(|| vec![DEFAULT_FOLDER.to_string()]),
    };
    if folders.is_empty() {
        return Err(Error::InvalidArgument("no folders to clean".to_string()));
    }

    let selection = match cli.time_range.as_deref() {
        Some([start, end]) => Selection::Window(TimeWindow::parse(start, end)?),
        Some(_) => {
            return Err(Error::InvalidArgument(
                "--time-range takes exactly two timestamps".to_string(),
            ));
        }
        None => Selection::OlderThan {
            days: cli.days.or(cleanup.days).unwrap_or(DEFAULT_DAYS),
        },
    };

    Ok(Settings {
        host,
        port: cli.port.or(imap.port).unwrap_or(DEFAULT_PORT),
        username,
        password: cli.password.clone().or(imap.password),
        use_tls: !cli.no_ssl && imap.tls.unwrap_or(true),
        skip_tls_verify: imap.skip_tls_verify.unwrap_or(false),
        folders,
        selection,
        dry_run: cli.dry_run,
        list_folders: cli.list_folders,
    })
}
