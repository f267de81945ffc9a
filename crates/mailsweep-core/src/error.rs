use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid time format: {0}. Expected format: 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD'")]
    BadTimestamp(String),

    #[error("Start time {start} must not be after end time {end}")]
    ReversedWindow { start: String, end: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to IMAP server: {0}")]
    Connect(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Failed to select folder '{folder}': {reason}")]
    Select { folder: String, reason: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Failed to fetch message {id}: {reason}")]
    Fetch { id: u32, reason: String },

    #[error("Failed to flag message {id} for deletion: {reason}")]
    Store { id: u32, reason: String },

    #[error("Expunge failed: {0}")]
    Expunge(String),

    #[error("Connection to IMAP server lost: {0}")]
    Transport(String),

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BadTimestamp(_)
            | Error::ReversedWindow { .. }
            | Error::InvalidArgument(_)
            | Error::Config(_) => 2,
            Error::Interrupted => 130,
            _ => 1,
        }
    }

    /// The connection can no longer be trusted.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn skips_folder(&self) -> bool {
        matches!(
            self,
            Error::Select { .. }
                | Error::Search(_)
                | Error::Fetch { .. }
                | Error::Store { .. }
                | Error::Expunge(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn argument_errors_exit_with_two() {
        assert_eq!(Error::BadTimestamp("nope".to_string()).exit_code(), 2);
        let reversed = Error::ReversedWindow {
            start: "2023-06-10 00:00".to_string(),
            end: "2023-06-01 00:00".to_string(),
        };
        assert_eq!(reversed.exit_code(), 2);
        assert_eq!(Error::Config("bad".to_string()).exit_code(), 2);
    }

    #[test]
    fn connection_errors_exit_with_one() {
        assert_eq!(Error::Connect("refused".to_string()).exit_code(), 1);
        assert_eq!(Error::Auth("denied".to_string()).exit_code(), 1);
        assert_eq!(Error::Transport("reset".to_string()).exit_code(), 1);
    }

    #[test]
    fn folder_level_errors_do_not_abort_the_run() {
        assert!(Error::Search("NO".to_string()).skips_folder());
        assert!(Error::Expunge("NO".to_string()).skips_folder());
        assert!(!Error::Transport("reset".to_string()).skips_folder());
        assert!(!Error::Interrupted.skips_folder());
    }
}
