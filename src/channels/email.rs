//! Mailbox access — `MailSource` trait and its IMAP-over-TLS adapter.
//!
//! The IMAP dialogue is a handful of blocking commands over rustls, run in
//! `spawn_blocking`. Credentials come in per request as an `ImapConfig`
//! value; a source never changes mailbox after construction.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls_pki_types::ServerName;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::channels::email_types::{literal_size, newest_first, parse_email, parse_search_ids};
use crate::error::ChannelError;
use crate::pipeline::types::RawEmail;

/// Default IMAP host when none is configured.
pub const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";

/// Default IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest message literal accepted from the server.
const MAX_MESSAGE_BYTES: usize = 25 * 1024 * 1024;

/// Longest response line accepted from the server.
const MAX_LINE_BYTES: usize = 64 * 1024;

// ── Trait ───────────────────────────────────────────────────────────

/// Something that can hand over the most recent emails of a mailbox.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Up to `limit` emails, newest first. A source without credentials
    /// returns an empty list rather than an error.
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawEmail>, ChannelError>;
}

// ── Configuration ───────────────────────────────────────────────────

/// Connection details for one mailbox.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
}

impl ImapConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_IMAP_PORT,
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Both user and password are non-empty.
    pub fn has_credentials(&self) -> bool {
        !self.user.trim().is_empty() && !self.password.expose_secret().is_empty()
    }
}

// ── IMAP source ─────────────────────────────────────────────────────

/// Reads `INBOX` over IMAPS.
pub struct ImapMailSource {
    config: ImapConfig,
}

impl ImapMailSource {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawEmail>, ChannelError> {
        if !self.config.has_credentials() {
            debug!("No mailbox credentials, skipping fetch");
            return Ok(Vec::new());
        }

        let cfg = self.config.clone();
        let emails = tokio::task::spawn_blocking(move || fetch_latest_imap(&cfg, limit))
            .await
            .map_err(|e| ChannelError::Protocol(format!("IMAP fetch task panicked: {e}")))??;

        info!(
            host = %self.config.host,
            count = emails.len(),
            "Fetched emails"
        );
        Ok(emails)
    }
}

/// Opens a mail source for a given mailbox. Lets callers pick the
/// mailbox per request without sharing mutable state.
pub trait MailSourceFactory: Send + Sync {
    fn open(&self, config: ImapConfig) -> Box<dyn MailSource>;
}

/// Opens `ImapMailSource`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImapSourceFactory;

impl MailSourceFactory for ImapSourceFactory {
    fn open(&self, config: ImapConfig) -> Box<dyn MailSource> {
        Box::new(ImapMailSource::new(config))
    }
}

/// Connect over TLS and run the fetch dialogue (blocking).
fn fetch_latest_imap(config: &ImapConfig, limit: usize) -> Result<Vec<RawEmail>, ChannelError> {
    let connect_err = |reason: String| ChannelError::ConnectFailed {
        host: config.host.clone(),
        reason,
    };

    let tcp = TcpStream::connect((config.host.as_str(), config.port))
        .map_err(|e| connect_err(e.to_string()))?;
    tcp.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| connect_err(format!("invalid server name: {e}")))?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)
        .map_err(|e| connect_err(format!("TLS setup failed: {e}")))?;
    let tls = rustls::StreamOwned::new(conn, tcp);

    run_fetch(tls, config, limit)
}

/// LOGIN, SELECT INBOX, SEARCH ALL, then FETCH the newest `limit` messages.
fn run_fetch<S: Read + Write>(
    stream: S,
    config: &ImapConfig,
    limit: usize,
) -> Result<Vec<RawEmail>, ChannelError> {
    let mut session = ImapSession::new(stream);

    let greeting = session.read_line()?;
    if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
        return Err(ChannelError::Protocol(format!(
            "unexpected greeting: {}",
            greeting.trim_end()
        )));
    }

    let login = session.command(&format!(
        "LOGIN {} {}",
        quote(&config.user),
        quote(config.password.expose_secret())
    ))?;
    if !login.is_ok() {
        return Err(ChannelError::AuthFailed {
            user: config.user.clone(),
        });
    }

    let select = session.command("SELECT \"INBOX\"")?;
    if !select.is_ok() {
        return Err(ChannelError::Protocol("SELECT INBOX rejected".into()));
    }

    let search = session.command("SEARCH ALL")?;
    if !search.is_ok() {
        return Err(ChannelError::Protocol("SEARCH rejected".into()));
    }
    let ids = newest_first(parse_search_ids(&search.lines), limit);
    debug!(count = ids.len(), "Fetching messages");

    let mut emails = Vec::with_capacity(ids.len());
    for id in &ids {
        let fetch = session.command(&format!("FETCH {id} RFC822"))?;
        let Some(raw) = fetch.literals.first() else {
            warn!(id = %id, "FETCH returned no message body");
            continue;
        };
        match parse_email(id, raw) {
            Some(email) => emails.push(email),
            None => warn!(id = %id, "Skipping unparseable message"),
        }
    }

    if let Err(e) = session.command("LOGOUT") {
        debug!("LOGOUT failed: {e}");
    }
    Ok(emails)
}

/// Quote an IMAP string argument.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

// ── Session ─────────────────────────────────────────────────────────

/// Lines and literals returned for one tagged command.
struct Response {
    lines: Vec<String>,
    literals: Vec<Vec<u8>>,
}

impl Response {
    /// The tagged completion line says `OK`.
    fn is_ok(&self) -> bool {
        self.lines
            .last()
            .and_then(|l| l.split_whitespace().nth(1))
            .is_some_and(|status| status.eq_ignore_ascii_case("OK"))
    }
}

struct ImapSession<S> {
    stream: S,
    next_tag: u32,
}

impl<S: Read + Write> ImapSession<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            next_tag: 1,
        }
    }

    fn read_line(&mut self) -> Result<String, ChannelError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.stream.read(&mut byte)? {
                0 => return Err(ChannelError::Protocol("IMAP connection closed".into())),
                _ => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                    if buf.len() >= MAX_LINE_BYTES {
                        return Err(ChannelError::Protocol(format!(
                            "response line exceeds {MAX_LINE_BYTES} bytes"
                        )));
                    }
                }
            }
        }
    }

    fn command(&mut self, cmd: &str) -> Result<Response, ChannelError> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        self.stream.write_all(format!("{tag} {cmd}\r\n").as_bytes())?;
        self.stream.flush()?;

        let done_prefix = format!("{tag} ");
        let mut lines = Vec::new();
        let mut literals = Vec::new();
        loop {
            let line = self.read_line()?;
            if let Some(size) = literal_size(&line) {
                if size > MAX_MESSAGE_BYTES {
                    return Err(ChannelError::Protocol(format!(
                        "literal of {size} bytes exceeds {MAX_MESSAGE_BYTES}"
                    )));
                }
                let mut literal = vec![0u8; size];
                self.stream.read_exact(&mut literal)?;
                literals.push(literal);
                lines.push(line);
                continue;
            }
            let done = line.starts_with(&done_prefix);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(Response { lines, literals })
    }
}
