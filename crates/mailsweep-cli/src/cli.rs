use std::path::PathBuf;

use clap::Parser;

#[path = "cli_config.rs"]
mod cli_config;
#[path = "cli_prompt.rs"]
mod cli_prompt;
#[path = "cli_settings.rs"]
mod cli_settings;
pub(crate) use cli_config::{FileConfig, load_file_config};
pub(crate) use cli_prompt::prompt_password;
pub(crate) use cli_settings::resolve_settings;

#[derive(Parser, Debug)]
#[command(
    name = "mailsweep",
    version,
    about = "Delete old messages from IMAP folders, by age or by time window"
)]
pub(crate) struct Cli {
    /// IMAP server hostname
    #[arg(long)]
    pub(crate) server: Option<String>,
    /// IMAP server port [default: 993]
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[arg(long)]
    pub(crate) username: Option<String>,
    /// Prompted for when neither given here nor in the config file
    #[arg(long)]
    pub(crate) password: Option<String>,
    /// Connect without TLS
    #[arg(long)]
    pub(crate) no_ssl: bool,
    /// Folder to clean [default: INBOX]
    #[arg(long, conflicts_with = "folders")]
    pub(crate) folder: Option<String>,
    /// Clean several folders in order
    #[arg(long, num_args = 1..)]
    pub(crate) folders: Option<Vec<String>>,
    /// List selectable folders and exit
    #[arg(long)]
    pub(crate) list_folders: bool,
    /// Delete messages older than this many days [default: 30]
    #[arg(long, conflicts_with = "time_range")]
    pub(crate) days: Option<u32>,
    /// Delete messages dated within START..END inclusive ("YYYY-MM-DD" or "YYYY-MM-DD HH:MM", UTC)
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub(crate) time_range: Option<Vec<String>>,
    /// Show what would be deleted without deleting anything
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// TOML config file
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}
