use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};

use crate::{Error, Result};

/// Fetch item used for previews. `PEEK` keeps `\Seen` untouched.
pub const HEADER_FETCH_ITEMS: &str = "(UID BODY.PEEK[HEADER.FIELDS (SUBJECT FROM DATE)])";
pub const DELETED_FLAG_STORE: &str = "+FLAGS (\\Deleted)";

/// Server UID of a message in the currently selected folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The IMAP commands the cleanup pipeline issues against an authenticated session.
///
/// Implementations report a severed connection as [`Error::Transport`] so callers can tell it
/// apart from a command the server merely refused.
pub trait MailboxSession {
    fn list_folders(&mut self) -> Result<Vec<String>>;

    /// Selects `folder` read-write and returns its message count.
    fn select(&mut self, folder: &str) -> Result<u32>;

    /// Runs `UID SEARCH`; ids come back in ascending UID order.
    fn search(&mut self, query: &str) -> Result<Vec<MessageId>>;

    /// Runs `UID FETCH <id> <items>` and returns the header block of the response.
    fn fetch_header_fields(&mut self, id: MessageId, items: &str) -> Result<Vec<u8>>;

    fn flag_deleted(&mut self, id: MessageId) -> Result<()>;

    fn expunge(&mut self) -> Result<()>;

    fn logout(&mut self) -> Result<()>;
}

/// Owns an authenticated session and logs it out exactly once, including while unwinding.
pub struct SessionGuard<S: MailboxSession> {
    session: S,
    released: bool,
}

impl<S: MailboxSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.session.logout() {
            Ok(()) => info!("Disconnected from IMAP server"),
            Err(err) => error!("Error during disconnect: {}", err),
        }
    }
}

impl<S: MailboxSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: MailboxSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: MailboxSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs `body` against `session`, then logs out whatever `body` returned.
pub fn with_session<S, T, F>(session: S, body: F) -> Result<T>
where
    S: MailboxSession,
    F: FnOnce(&mut S) -> Result<T>,
{
    let mut guard = SessionGuard::new(session);
    let outcome = body(&mut *guard);
    guard.close();
    outcome
}

type AbortHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct InterruptState {
    triggered: AtomicBool,
    abort: Mutex<Option<AbortHook>>,
}

/// Operator interrupt flag, checked between network round trips.
///
/// While a connection is open it can carry an abort hook that cuts off the command in flight,
/// so a blocked call returns a transport error and unwinds through the session guard.
#[derive(Clone, Default)]
pub struct Interrupt(Arc<InterruptState>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this was the first trigger.
    pub fn trigger(&self) -> bool {
        !self.0.triggered.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.triggered.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    pub fn set_abort<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.abort_slot() = Some(Box::new(hook));
    }

    pub fn clear_abort(&self) {
        *self.abort_slot() = None;
    }

    /// Runs the abort hook. Returns false when no connection is registered.
    pub fn abort(&self) -> bool {
        match self.abort_slot().as_ref() {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }

    fn abort_slot(&self) -> MutexGuard<'_, Option<AbortHook>> {
        self.0.abort.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::{Interrupt, MailboxSession, SessionGuard, with_session};
    use crate::Error;
    use crate::mock::MockServer;

    fn logouts(server: &MockServer) -> usize {
        server.trace().iter().filter(|c| c.as_str() == "LOGOUT").count()
    }

    #[test]
    fn logout_once_after_success() {
        let server = MockServer::new();
        let folders = with_session(server.connect(), |s| s.list_folders()).unwrap();
        assert_eq!(folders, vec!["INBOX".to_string()]);
        assert_eq!(logouts(&server), 1);
    }

    #[test]
    fn logout_once_after_failure() {
        let server = MockServer::new();
        let err = with_session(server.connect(), |s| {
            s.select("Missing")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Select { .. }));
        assert_eq!(logouts(&server), 1);
    }

    #[test]
    fn logout_once_while_unwinding() {
        let server = MockServer::new();
        let session = server.connect();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut guard = SessionGuard::new(session);
            let _ = guard.select("INBOX");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(logouts(&server), 1);
    }

    #[test]
    fn explicit_close_does_not_log_out_twice() {
        let server = MockServer::new();
        let guard = SessionGuard::new(server.connect());
        guard.close();
        assert_eq!(logouts(&server), 1);
    }

    #[test]
    fn logout_failure_does_not_mask_the_result() {
        let server = MockServer::new();
        server.fail_logout();
        let count = with_session(server.connect(), |s| s.select("INBOX")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn interrupt_reports_first_trigger_only() {
        let interrupt = Interrupt::new();
        assert!(interrupt.check().is_ok());
        assert!(interrupt.trigger());
        assert!(!interrupt.clone().trigger());
        assert!(matches!(interrupt.check(), Err(Error::Interrupted)));
    }

    #[test]
    fn abort_runs_the_registered_hook_until_cleared() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.abort());

        let server = MockServer::new();
        let handle = server.abort_handle();
        interrupt.set_abort(move || handle.abort());
        let mut session = server.connect();
        assert!(interrupt.abort());
        assert!(session.list_folders().unwrap_err().is_transport());

        interrupt.clear_abort();
        assert!(!interrupt.abort());
    }
}
