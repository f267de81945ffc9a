use std::io::Write;

use tracing::{error, info, warn};

use crate::commit::commit;
use crate::query::Selection;
use crate::refine::{Target, refine};
use crate::report::{Counts, FolderReport, RunReport};
use crate::session::{Interrupt, MailboxSession};
use crate::time::Clock;
use crate::{Error, Result};

/// A validated cleanup request. The search predicate is fixed when the plan is built, so
/// every folder is searched with the same cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub selection: Selection,
    pub dry_run: bool,
    query: String,
}

impl Plan {
    pub fn new(selection: Selection, dry_run: bool, clock: &dyn Clock) -> Result<Self> {
        let query = selection.search_query(clock.today())?;
        Ok(Self {
            selection,
            dry_run,
            query,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Cleans `folders` in order, recording each finished folder in `report`.
///
/// Folder-level failures are logged and the folder skipped. A lost connection or an interrupt
/// ends the run; `report` still holds the folders completed before that.
pub fn run_folders<S, W>(
    session: &mut S,
    folders: &[String],
    plan: &Plan,
    interrupt: &Interrupt,
    report: &mut RunReport,
    out: &mut W,
) -> Result<()>
where
    S: MailboxSession + ?Sized,
    W: Write + ?Sized,
{
    if plan.dry_run {
        info!("Running in DRY-RUN mode (no emails will be deleted)");
    } else {
        warn!("Running in DELETION mode - emails will be permanently deleted!");
    }
    info!("Search mode: {}", plan.selection.describe());

    for folder in folders {
        interrupt.check()?;
        info!("Processing folder: {}", folder);
        match clean_folder(session, folder, plan, interrupt, out) {
            Ok(folder_report) => {
                info!("{}", folder_report.summary_line(plan.dry_run));
                report.folders.push(folder_report);
            }
            Err(err) if err.is_transport() && interrupt.is_triggered() => {
                warn!("Connection to IMAP server cut while processing '{}'", folder);
                return Err(Error::Interrupted);
            }
            Err(err) if err.skips_folder() => {
                error!("{}; skipping folder '{}'", err, folder);
                report.skipped.push(folder.clone());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub fn clean_folder<S, W>(
    session: &mut S,
    folder: &str,
    plan: &Plan,
    interrupt: &Interrupt,
    out: &mut W,
) -> Result<FolderReport>
where
    S: MailboxSession + ?Sized,
    W: Write + ?Sized,
{
    let exists = session.select(folder)?;
    info!("Selected folder '{}' with {} messages", folder, exists);
    if exists == 0 {
        return Ok(FolderReport::empty(folder));
    }

    info!("IMAP search query: {}", plan.query());
    let candidates = session.search(plan.query())?;
    info!("IMAP search found {} candidate messages", candidates.len());

    let mut counts = Counts {
        candidates: candidates.len(),
        ..Counts::default()
    };
    let targets = match &plan.selection {
        Selection::Window(window) => {
            let refinement = refine(session, &candidates, window, interrupt)?;
            counts.refined = Some(refinement.kept.len());
            counts.parse_failures = refinement.parse_failures;
            refinement.kept
        }
        Selection::OlderThan { .. } => candidates.into_iter().map(Target::unfetched).collect(),
    };

    let outcome = match commit(session, targets, plan.dry_run, interrupt, out) {
        Err(Error::Expunge(reason)) => {
            warn!(
                "Messages in '{}' stay flagged \\Deleted until the next expunge",
                folder
            );
            return Err(Error::Expunge(reason));
        }
        other => other?,
    };
    counts.previewed = outcome.previewed;
    counts.deleted = outcome.flagged;
    Ok(FolderReport {
        folder: folder.to_string(),
        counts,
    })
}
