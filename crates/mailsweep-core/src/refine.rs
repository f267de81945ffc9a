use tracing::{debug, info, warn};

use crate::Result;
use crate::headers::{MessageHeaders, fetch_headers};
use crate::session::{Interrupt, MailboxSession, MessageId};
use crate::time::TimeWindow;

/// A message queued for deletion, with its headers if they were already fetched.
#[derive(Debug, Clone)]
pub struct Target {
    pub id: MessageId,
    pub headers: Option<MessageHeaders>,
}

impl Target {
    pub fn unfetched(id: MessageId) -> Self {
        Self { id, headers: None }
    }
}

#[derive(Debug, Default)]
pub struct Refinement {
    pub kept: Vec<Target>,
    pub excluded: usize,
    pub parse_failures: usize,
}

/// Narrows a day-granular candidate list to messages whose `Date` header lies in `window`.
///
/// Server order is preserved. Messages without a parseable date are dropped.
pub fn refine<S: MailboxSession + ?Sized>(
    session: &mut S,
    candidates: &[MessageId],
    window: &TimeWindow,
    interrupt: &Interrupt,
) -> Result<Refinement> {
    let mut out = Refinement::default();
    for &id in candidates {
        interrupt.check()?;
        let headers = fetch_headers(session, id);
        match headers.date_parsed {
            None => {
                out.parse_failures += 1;
                warn!(
                    "Could not parse date '{}' for message ID {}",
                    headers.date_raw, id
                );
            }
            Some(date) if window.contains(&date) => {
                out.kept.push(Target {
                    id,
                    headers: Some(headers),
                });
            }
            Some(date) => {
                out.excluded += 1;
                debug!(
                    "Message outside time range: ID: {}, Date: {}, Parsed: {}",
                    id, headers.date_raw, date
                );
            }
        }
    }
    info!(
        "Time filtering: {} messages within time range, {} outside range, {} date parsing errors",
        out.kept.len(),
        out.excluded,
        out.parse_failures
    );
    Ok(out)
}
