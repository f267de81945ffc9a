//! Time-window message selection and deletion pipeline for IMAP mailboxes.
//!
//! The server only searches by whole days, so a window is translated into a day-granular
//! superset, refined against each message's `Date` header, and then previewed or deleted.

mod commit;
mod driver;
mod error;
mod headers;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
mod query;
mod refine;
mod report;
mod session;
mod time;

pub use commit::{CommitOutcome, commit, preview_line};
pub use driver::{Plan, clean_folder, run_folders};
pub use error::{Error, Result};
pub use headers::{
    MessageHeaders, NO_SUBJECT, UNKNOWN_DATE, UNKNOWN_SENDER, fetch_headers, parse_header_date,
};
pub use query::{Selection, imap_date};
pub use refine::{Refinement, Target, refine};
pub use report::{Counts, FolderReport, RunReport};
pub use session::{
    DELETED_FLAG_STORE, HEADER_FETCH_ITEMS, Interrupt, MailboxSession, MessageId, SessionGuard,
    with_session,
};
pub use time::{
    Clock, FixedClock, Instant, SystemClock, TimeWindow, format_timestamp, parse_timestamp,
};
