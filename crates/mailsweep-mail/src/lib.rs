//! IMAP transport for the cleanup pipeline.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use tracing::{debug, info};

use mailsweep_core::{
    DELETED_FLAG_STORE, Error, MailboxSession, MessageId, Result,
};

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub skip_tls_verify: bool,
}

#[derive(Debug)]
enum ImapStream {
    Plain(TcpStream),
    Tls(native_tls::TlsStream<TcpStream>),
}

impl Read for ImapStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ImapStream::Plain(stream) => stream.read(buf),
            ImapStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for ImapStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ImapStream::Plain(stream) => stream.write(buf),
            ImapStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ImapStream::Plain(stream) => stream.flush(),
            ImapStream::Tls(stream) => stream.flush(),
        }
    }
}

/// Shuts the socket down from another thread. A command blocked on it fails with an I/O
/// error, which surfaces as [`Error::Transport`].
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<TcpStream>);

impl AbortHandle {
    pub fn abort(&self) {
        if let Err(err) = self.0.shutdown(Shutdown::Both) {
            debug!("imap abort shutdown failed: {}", err);
        }
    }
}

pub struct ImapMailbox {
    session: imap::Session<ImapStream>,
    abort: AbortHandle,
}

impl ImapMailbox {
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}

fn connect_error(err: impl std::fmt::Display) -> Error {
    Error::Connect(err.to_string())
}

/// Opens the connection (implicit TLS unless disabled) and logs in. Failures map to
/// `Connect` and `Auth` respectively.
pub fn imap_connect(config: &ImapConfig) -> Result<ImapMailbox> {
    debug!(
        "imap_connect start host={} port={} tls={}",
        config.host, config.port, config.use_tls
    );
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(connect_error)?;
    let abort = AbortHandle(Arc::new(tcp.try_clone().map_err(connect_error)?));
    debug!("imap_connect tcp connected");
    let stream = if config.use_tls {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(connect_error)?;
        ImapStream::Tls(tls.connect(&config.host, tcp).map_err(connect_error)?)
    } else {
        ImapStream::Plain(tcp)
    };
    let mut client = imap::Client::new(stream);
    client.read_greeting().map_err(connect_error)?;
    let session = client
        .login(&config.username, &config.password)
        .map_err(|(e, _)| Error::Auth(e.to_string()))?;
    info!(
        "Successfully connected to {} as {}",
        config.host, config.username
    );
    Ok(ImapMailbox { session, abort })
}

/// Errors that leave the connection unusable.
fn is_transport(err: &imap::Error) -> bool {
    matches!(
        err,
        imap::Error::Io(_) | imap::Error::ConnectionLost | imap::Error::Bye(_)
    )
}

fn classify(err: imap::Error, kind: impl FnOnce(String) -> Error) -> Error {
    if is_transport(&err) {
        Error::Transport(err.to_string())
    } else {
        kind(err.to_string())
    }
}

fn is_selectable(folder: &imap::types::Name) -> bool {
    !folder
        .attributes()
        .iter()
        .any(|attr| matches!(attr, imap_proto::NameAttribute::NoSelect))
}

impl MailboxSession for ImapMailbox {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        let list = self
            .session
            .list(None, Some("*"))
            .map_err(|e| classify(e, |reason| Error::Search(format!("LIST failed: {}", reason))))?;
        debug!("imap_list_folders raw_count={}", list.len());
        Ok(list
            .iter()
            .filter(|folder| is_selectable(folder))
            .map(|folder| folder.name().to_string())
            .collect())
    }

    fn select(&mut self, folder: &str) -> Result<u32> {
        let mailbox = self.session.select(folder).map_err(|e| {
            classify(e, |reason| Error::Select {
                folder: folder.to_string(),
                reason,
            })
        })?;
        Ok(mailbox.exists)
    }

    fn search(&mut self, query: &str) -> Result<Vec<MessageId>> {
        let uids = self
            .session
            .uid_search(query)
            .map_err(|e| classify(e, Error::Search))?;
        let mut ids: Vec<MessageId> = uids.into_iter().map(MessageId).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_header_fields(&mut self, id: MessageId, items: &str) -> Result<Vec<u8>> {
        let fetches = self
            .session
            .uid_fetch(id.to_string(), items)
            .map_err(|e| classify(e, |reason| Error::Fetch { id: id.0, reason }))?;
        fetches
            .iter()
            .find(|f| f.uid == Some(id.0))
            .and_then(|f| f.header().or_else(|| f.body()))
            .map(|raw| raw.to_vec())
            .ok_or_else(|| Error::Fetch {
                id: id.0,
                reason: "no header data in response".to_string(),
            })
    }

    fn flag_deleted(&mut self, id: MessageId) -> Result<()> {
        self.session
            .uid_store(id.to_string(), DELETED_FLAG_STORE)
            .map_err(|e| classify(e, |reason| Error::Store { id: id.0, reason }))?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        self.session
            .expunge()
            .map_err(|e| classify(e, Error::Expunge))?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.session
            .logout()
            .map_err(|e| Error::Transport(e.to_string()))
    }
}
