//! Scripted in-memory IMAP server for exercising the pipeline without a network.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, Utc};

use crate::headers::parse_header_date;
use crate::session::{DELETED_FLAG_STORE, Interrupt, MailboxSession, MessageId};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockMessage {
    pub uid: u32,
    /// Date the server compares `BEFORE`/`SINCE` against.
    pub internal_date: NaiveDate,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
    pub seen: bool,
    pub deleted: bool,
}

impl MockMessage {
    /// Message whose internal date is the UTC day of its `Date` header (1970-01-01 if the
    /// header does not parse).
    pub fn dated(uid: u32, date: &str) -> Self {
        let internal_date = parse_header_date(date)
            .map(|d| d.with_timezone(&Utc).date_naive())
            .unwrap_or_default();
        Self {
            uid,
            internal_date,
            subject: Some(format!("Message {}", uid)),
            from: Some("sender@example.com".to_string()),
            date: Some(date.to_string()),
            seen: false,
            deleted: false,
        }
    }

    pub fn undated(uid: u32) -> Self {
        Self {
            date: None,
            ..Self::dated(uid, "")
        }
    }

    pub fn received(mut self, day: NaiveDate) -> Self {
        self.internal_date = day;
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn seen(mut self) -> Self {
        self.seen = true;
        self
    }

    fn header_block(&self) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in [
            ("Subject", &self.subject),
            ("From", &self.from),
            ("Date", &self.date),
        ] {
            if let Some(value) = value {
                out.push_str(&format!("{}: {}\r\n", name, value));
            }
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

#[derive(Debug)]
struct MockFolder {
    name: String,
    messages: Vec<MockMessage>,
}

#[derive(Debug, Default)]
struct State {
    folders: Vec<MockFolder>,
    selected: Option<usize>,
    trace: Vec<String>,
    failing_selects: HashSet<String>,
    failing_searches: HashSet<String>,
    failing_fetches: HashSet<u32>,
    failing_stores: HashSet<u32>,
    sever_on_store: Option<u32>,
    failing_expunge: bool,
    failing_logout: bool,
    severed: bool,
    aborted: Arc<AtomicBool>,
    stores: usize,
    interrupt_after: Option<(usize, Interrupt)>,
    abort_during_store: Option<(u32, Interrupt)>,
}

impl State {
    fn folder_index(&self, name: &str) -> Option<usize> {
        self.folders.iter().position(|f| f.name == name)
    }

    fn ensure_folder(&mut self, name: &str) -> usize {
        match self.folder_index(name) {
            Some(idx) => idx,
            None => {
                self.folders.push(MockFolder {
                    name: name.to_string(),
                    messages: Vec::new(),
                });
                self.folders.len() - 1
            }
        }
    }

    fn record(&mut self, command: String) -> Result<()> {
        self.trace.push(command);
        if self.severed || self.aborted.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection reset by peer".to_string()));
        }
        Ok(())
    }

    fn selected_folder(&mut self) -> Result<&mut MockFolder> {
        let idx = self
            .selected
            .ok_or_else(|| Error::Search("no mailbox selected".to_string()))?;
        Ok(&mut self.folders[idx])
    }
}

/// Shared handle to the fake server; sessions opened from it see the same mailbox state.
#[derive(Debug, Clone)]
pub struct MockServer {
    state: Rc<RefCell<State>>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    pub fn new() -> Self {
        let server = Self {
            state: Rc::new(RefCell::new(State::default())),
        };
        server.add_folder("INBOX");
        server
    }

    pub fn connect(&self) -> MockMailbox {
        MockMailbox {
            state: Rc::clone(&self.state),
        }
    }

    pub fn add_folder(&self, name: &str) {
        self.state.borrow_mut().ensure_folder(name);
    }

    pub fn add_message(&self, folder: &str, message: MockMessage) {
        let mut state = self.state.borrow_mut();
        let idx = state.ensure_folder(folder);
        state.folders[idx].messages.push(message);
    }

    pub fn trace(&self) -> Vec<String> {
        self.state.borrow().trace.clone()
    }

    pub fn message(&self, folder: &str, uid: u32) -> Option<MockMessage> {
        let state = self.state.borrow();
        let idx = state.folder_index(folder)?;
        state.folders[idx]
            .messages
            .iter()
            .find(|m| m.uid == uid)
            .cloned()
    }

    pub fn message_count(&self, folder: &str) -> usize {
        self.uids(folder).len()
    }

    pub fn uids(&self, folder: &str) -> Vec<u32> {
        let state = self.state.borrow();
        match state.folder_index(folder) {
            Some(idx) => state.folders[idx].messages.iter().map(|m| m.uid).collect(),
            None => Vec::new(),
        }
    }

    pub fn fail_select(&self, folder: &str) {
        self.state
            .borrow_mut()
            .failing_selects
            .insert(folder.to_string());
    }

    pub fn fail_search(&self, folder: &str) {
        self.state
            .borrow_mut()
            .failing_searches
            .insert(folder.to_string());
    }

    pub fn fail_fetch(&self, uid: u32) {
        self.state.borrow_mut().failing_fetches.insert(uid);
    }

    pub fn fail_store(&self, uid: u32) {
        self.state.borrow_mut().failing_stores.insert(uid);
    }

    /// The connection drops while storing flags on `uid`.
    pub fn sever_on_store(&self, uid: u32) {
        self.state.borrow_mut().sever_on_store = Some(uid);
    }

    pub fn fail_expunge(&self) {
        self.state.borrow_mut().failing_expunge = true;
    }

    pub fn fail_logout(&self) {
        self.state.borrow_mut().failing_logout = true;
    }

    /// Handle that drops the connection from outside the session, like a socket shutdown.
    pub fn abort_handle(&self) -> MockAbort {
        MockAbort(Arc::clone(&self.state.borrow().aborted))
    }

    /// Simulates the operator pressing Ctrl-C twice while the store for `uid` is in flight.
    /// The interrupt's abort hook runs and the store fails as a lost connection.
    pub fn abort_during_store(&self, uid: u32, interrupt: Interrupt) {
        self.state.borrow_mut().abort_during_store = Some((uid, interrupt));
    }

    /// Simulates the operator pressing Ctrl-C once `count` flags have been stored.
    pub fn interrupt_after_stores(&self, count: usize, interrupt: Interrupt) {
        let mut state = self.state.borrow_mut();
        state.stores = 0;
        state.interrupt_after = Some((count, interrupt));
    }
}

#[derive(Debug, Clone)]
pub struct MockAbort(Arc<AtomicBool>);

impl MockAbort {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct MockMailbox {
    state: Rc<RefCell<State>>,
}

impl MailboxSession for MockMailbox {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        let mut state = self.state.borrow_mut();
        state.record("LIST \"\" *".to_string())?;
        Ok(state.folders.iter().map(|f| f.name.clone()).collect())
    }

    fn select(&mut self, folder: &str) -> Result<u32> {
        let mut state = self.state.borrow_mut();
        state.record(format!("SELECT {}", folder))?;
        state.selected = None;
        let idx = match state.folder_index(folder) {
            Some(idx) if !state.failing_selects.contains(folder) => idx,
            _ => {
                return Err(Error::Select {
                    folder: folder.to_string(),
                    reason: "NO Mailbox does not exist".to_string(),
                });
            }
        };
        state.selected = Some(idx);
        Ok(state.folders[idx].messages.len() as u32)
    }

    fn search(&mut self, query: &str) -> Result<Vec<MessageId>> {
        let mut state = self.state.borrow_mut();
        state.record(format!("UID SEARCH {}", query))?;
        let criteria = parse_criteria(query)?;
        let failing = state.failing_searches.clone();
        let folder = state.selected_folder()?;
        if failing.contains(&folder.name) {
            return Err(Error::Search("NO search failed".to_string()));
        }
        let mut ids: Vec<MessageId> = folder
            .messages
            .iter()
            .filter(|m| criteria.iter().all(|c| c.matches(m.internal_date)))
            .map(|m| MessageId(m.uid))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn fetch_header_fields(&mut self, id: MessageId, items: &str) -> Result<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.record(format!("UID FETCH {} {}", id, items))?;
        let failing = state.failing_fetches.contains(&id.0);
        let folder = state.selected_folder()?;
        let message = folder
            .messages
            .iter_mut()
            .find(|m| m.uid == id.0)
            .filter(|_| !failing)
            .ok_or_else(|| Error::Fetch {
                id: id.0,
                reason: "NO fetch failed".to_string(),
            })?;
        // A plain BODY[...] fetch marks the message read; BODY.PEEK[...] does not.
        if items.contains("BODY[") {
            message.seen = true;
        }
        Ok(message.header_block())
    }

    fn flag_deleted(&mut self, id: MessageId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.record(format!("UID STORE {} {}", id, DELETED_FLAG_STORE))?;
        if let Some((uid, interrupt)) = state.abort_during_store.take() {
            if uid == id.0 {
                interrupt.trigger();
                interrupt.abort();
                return Err(Error::Transport("connection aborted".to_string()));
            }
            state.abort_during_store = Some((uid, interrupt));
        }
        if state.sever_on_store == Some(id.0) {
            state.severed = true;
            return Err(Error::Transport("connection reset by peer".to_string()));
        }
        if state.failing_stores.contains(&id.0) {
            return Err(Error::Store {
                id: id.0,
                reason: "NO permission denied".to_string(),
            });
        }
        let folder = state.selected_folder()?;
        if let Some(message) = folder.messages.iter_mut().find(|m| m.uid == id.0) {
            message.deleted = true;
        }
        state.stores += 1;
        let stores = state.stores;
        if let Some((after, interrupt)) = state.interrupt_after.take() {
            if stores >= after {
                interrupt.trigger();
            } else {
                state.interrupt_after = Some((after, interrupt));
            }
        }
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.record("EXPUNGE".to_string())?;
        if state.failing_expunge {
            return Err(Error::Expunge("NO expunge failed".to_string()));
        }
        let folder = state.selected_folder()?;
        folder.messages.retain(|m| !m.deleted);
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.record("LOGOUT".to_string())?;
        state.selected = None;
        if state.failing_logout {
            return Err(Error::Transport("BYE without OK".to_string()));
        }
        Ok(())
    }
}

enum Criterion {
    All,
    Before(NaiveDate),
    Since(NaiveDate),
}

impl Criterion {
    fn matches(&self, internal: NaiveDate) -> bool {
        match self {
            Criterion::All => true,
            Criterion::Before(day) => internal < *day,
            Criterion::Since(day) => internal >= *day,
        }
    }
}

fn parse_criteria(query: &str) -> Result<Vec<Criterion>> {
    let mut tokens = query.split_whitespace();
    let mut out = Vec::new();
    while let Some(keyword) = tokens.next() {
        let criterion = match keyword.to_ascii_uppercase().as_str() {
            "ALL" => Criterion::All,
            "BEFORE" => Criterion::Before(parse_search_date(tokens.next())?),
            "SINCE" => Criterion::Since(parse_search_date(tokens.next())?),
            other => return Err(Error::Search(format!("BAD unsupported criterion {}", other))),
        };
        out.push(criterion);
    }
    Ok(out)
}

fn parse_search_date(token: Option<&str>) -> Result<NaiveDate> {
    let token = token.ok_or_else(|| Error::Search("BAD missing date".to_string()))?;
    NaiveDate::parse_from_str(token, "%d-%b-%Y")
        .map_err(|_| Error::Search(format!("BAD invalid date {}", token)))
}
