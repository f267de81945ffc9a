use std::io::Write;

use tracing::{error, info};

use crate::Result;
use crate::headers::{MessageHeaders, fetch_headers};
use crate::refine::Target;
use crate::session::{Interrupt, MailboxSession, MessageId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub previewed: usize,
    /// Messages successfully flagged `\Deleted`; zero in a dry run.
    pub flagged: usize,
}

pub fn preview_line(id: MessageId, headers: &MessageHeaders) -> String {
    format!(
        "ID:{} Subject:{} From:{} Date:{}",
        id, headers.subject, headers.sender, headers.date_raw
    )
}

/// Previews every target and, unless `dry_run`, flags each one and expunges once at the end.
/// A refused `STORE` is logged and skipped; a lost connection aborts.
pub fn commit<S, W>(
    session: &mut S,
    targets: Vec<Target>,
    dry_run: bool,
    interrupt: &Interrupt,
    out: &mut W,
) -> Result<CommitOutcome>
where
    S: MailboxSession + ?Sized,
    W: Write + ?Sized,
{
    let mut outcome = CommitOutcome::default();
    if targets.is_empty() {
        info!("No messages to delete");
        return Ok(outcome);
    }
    for target in targets {
        interrupt.check()?;
        let headers = match target.headers {
            Some(headers) => headers,
            None => fetch_headers(session, target.id),
        };
        let line = preview_line(target.id, &headers);
        outcome.previewed += 1;
        if dry_run {
            writeln!(out, "Would delete: {}", line)?;
            continue;
        }
        writeln!(out, "Deleting: {}", line)?;
        match session.flag_deleted(target.id) {
            Ok(()) => {
                outcome.flagged += 1;
                info!("Marked for deletion: {}", line);
            }
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => error!("{}", err),
        }
    }
    if !dry_run && outcome.flagged > 0 {
        session.expunge()?;
        info!("Expunged {} messages", outcome.flagged);
    }
    Ok(outcome)
}
