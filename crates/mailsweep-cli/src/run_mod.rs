use std::io::Write;

use anyhow::{Context, Result};
use mailsweep_core::{
    Clock, Error, Interrupt, MailboxSession, Plan, RunReport, SystemClock, run_folders,
    with_session,
};
use mailsweep_mail::{ImapConfig, ImapMailbox, imap_connect};
use tracing::info;

use crate::cli::{Cli, FileConfig, load_file_config, prompt_password, resolve_settings};

pub(crate) fn run(cli: &Cli, interrupt: &Interrupt) -> Result<()> {
    let file = load_file_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let connect = |config: &ImapConfig| -> mailsweep_core::Result<ImapMailbox> {
        let mailbox = imap_connect(config)?;
        let handle = mailbox.abort_handle();
        interrupt.set_abort(move || handle.abort());
        Ok(mailbox)
    };
    execute(
        cli,
        file,
        &SystemClock,
        connect,
        prompt_password,
        interrupt,
        &mut out,
    )
}

/// Everything after config loading. Argument problems surface before `prompt` or `connect`
/// is called. Folders finished before a failure are still summarized.
pub(crate) fn execute<S, C, P, W>(
    cli: &Cli,
    file: FileConfig,
    clock: &dyn Clock,
    connect: C,
    prompt: P,
    interrupt: &Interrupt,
    out: &mut W,
) -> Result<()>
where
    S: MailboxSession,
    C: FnOnce(&ImapConfig) -> mailsweep_core::Result<S>,
    P: FnOnce(&str) -> mailsweep_core::Result<String>,
    W: Write,
{
    let settings = resolve_settings(cli, file)?;
    let plan = Plan::new(settings.selection.clone(), settings.dry_run, clock)?;

    info!(
        "Starting IMAP cleanup on {}:{} as {}",
        settings.host, settings.port, settings.username
    );
    if !settings.list_folders {
        info!("Target folders: {}", settings.folders.join(", "));
    }

    let password = match settings.password.clone() {
        Some(password) => password,
        None => prompt(settings.username.as_str())?,
    };
    interrupt.check()?;
    let session = connect(&settings.imap_config(password))?;

    let mut report = RunReport::new(plan.dry_run);
    let outcome = if settings.list_folders {
        with_session(session, |session| write_folder_list(session, out))
    } else {
        with_session(session, |session| {
            run_folders(session, &settings.folders, &plan, interrupt, &mut report, out)
        })
    };
    interrupt.clear_abort();
    if !settings.list_folders {
        for line in report.summary_lines() {
            writeln!(out, "{}", line).map_err(Error::from)?;
        }
    }
    outcome?;
    info!("Operation complete");
    Ok(())
}

fn write_folder_list<S, W>(session: &mut S, out: &mut W) -> mailsweep_core::Result<()>
where
    S: MailboxSession,
    W: Write,
{
    let folders = session.list_folders()?;
    info!("Found {} selectable folders", folders.len());
    for folder in &folders {
        writeln!(out, "  - {}", folder)?;
    }
    Ok(())
}

/// Maps a failed run to the process exit status.
pub(crate) fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1)
}
