//! IMAP mail store — raw IMAP over rustls, blocking I/O behind
//! `spawn_blocking`.
//!
//! One short-lived session per operation: connect, LOGIN, run the commands,
//! LOGOUT. The triage workload is request-at-a-time, so connection reuse
//! buys little and a fresh session keeps the protocol state trivial.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::ImapConfig;
use crate::error::MailStoreError;
use crate::mail::store::MailStore;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

// ── Session ─────────────────────────────────────────────────────────

/// Blocking IMAP session over TLS.
struct ImapSession {
    stream: TlsStream,
    tag: u32,
}

impl ImapSession {
    fn connect(config: &ImapConfig) -> Result<Self, MailStoreError> {
        let tcp = TcpStream::connect((&*config.host, config.port)).map_err(|e| {
            MailStoreError::Connect {
                host: config.host.clone(),
                reason: e.to_string(),
            }
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        );
        let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
            .map_err(|e| MailStoreError::Tls(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| MailStoreError::Tls(e.to_string()))?;

        let mut session = Self {
            stream: rustls::StreamOwned::new(conn, tcp),
            tag: 0,
        };

        // Server greeting
        session.read_line()?;

        let login = format!(
            "LOGIN \"{}\" \"{}\"",
            config.username,
            config.password.expose_secret()
        );
        let reply = session.command(&login)?;
        if !status_ok(&reply) {
            return Err(MailStoreError::AuthFailed {
                username: config.username.clone(),
            });
        }

        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, MailStoreError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.stream.read(&mut byte) {
                Ok(0) => {
                    return Err(MailStoreError::CommandFailed {
                        command: "read".into(),
                        reason: "connection closed".into(),
                    });
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send one tagged command and collect lines through the tagged reply.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, MailStoreError> {
        self.tag += 1;
        let tag = format!("T{}", self.tag);
        let full = format!("{tag} {cmd}\r\n");
        self.stream.write_all(full.as_bytes())?;
        self.stream.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Command that must succeed; a NO/BAD reply maps to `CommandFailed`.
    fn expect_ok(&mut self, cmd: &str, label: &str) -> Result<Vec<String>, MailStoreError> {
        let lines = self.command(cmd)?;
        if status_ok(&lines) {
            Ok(lines)
        } else {
            Err(MailStoreError::CommandFailed {
                command: label.to_string(),
                reason: tagged_reply(&lines),
            })
        }
    }

    fn select(&mut self, mailbox: &str) -> Result<(), MailStoreError> {
        let lines = self.command(&format!("SELECT \"{mailbox}\""))?;
        if status_ok(&lines) {
            Ok(())
        } else {
            Err(MailStoreError::SelectFailed {
                mailbox: mailbox.to_string(),
                reason: tagged_reply(&lines),
            })
        }
    }

    fn search_since(&mut self, since: NaiveDate) -> Result<Vec<String>, MailStoreError> {
        let date = since.format("%d-%b-%Y");
        let lines = self.expect_ok(&format!("SEARCH SINCE {date}"), "SEARCH")?;
        Ok(parse_search_ids(&lines))
    }

    fn fetch_rfc822(&mut self, mailbox: &str, id: &str) -> Result<Vec<u8>, MailStoreError> {
        let lines = self.expect_ok(&format!("FETCH {id} (RFC822)"), "FETCH")?;
        // Untagged FETCH line, message lines, closing paren, tagged reply.
        if lines.len() < 3 {
            return Err(MailStoreError::NotFound {
                mailbox: mailbox.to_string(),
                id: id.to_string(),
            });
        }
        let raw: String = lines[1..lines.len() - 2].concat();
        Ok(raw.into_bytes())
    }

    /// CREATE that treats an already-existing folder as success.
    fn create_idempotent(&mut self, folder: &str) -> Result<(), MailStoreError> {
        let lines = self.command(&format!("CREATE \"{folder}\""))?;
        if status_ok(&lines) {
            debug!(folder, "Created folder");
            return Ok(());
        }
        // Servers answer NO (often [ALREADYEXISTS]) when the folder is
        // already present; that satisfies the idempotent-create contract.
        if status_no(&lines) {
            debug!(folder, "Folder already exists");
            Ok(())
        } else {
            Err(MailStoreError::CommandFailed {
                command: "CREATE".into(),
                reason: tagged_reply(&lines),
            })
        }
    }

    fn logout(mut self) {
        let _ = self.command("LOGOUT");
    }
}

// ── Reply parsing ───────────────────────────────────────────────────

fn reply_status(lines: &[String]) -> Option<&str> {
    lines
        .last()
        .and_then(|line| line.split_whitespace().nth(1))
}

fn status_ok(lines: &[String]) -> bool {
    reply_status(lines) == Some("OK")
}

fn status_no(lines: &[String]) -> bool {
    reply_status(lines) == Some("NO")
}

fn tagged_reply(lines: &[String]) -> String {
    lines
        .last()
        .map(|l| l.trim_end().to_string())
        .unwrap_or_default()
}

/// Ids from untagged `* SEARCH n n n` lines.
fn parse_search_ids(lines: &[String]) -> Vec<String> {
    let mut ids = Vec::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix("* SEARCH") {
            ids.extend(rest.split_whitespace().map(str::to_string));
        }
    }
    ids
}

// ── Store implementation ────────────────────────────────────────────

/// [`MailStore`] over IMAP. Each call runs a fresh blocking session on the
/// blocking thread pool.
pub struct ImapMailStore {
    config: ImapConfig,
}

impl ImapMailStore {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, MailStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> Result<T, MailStoreError> + Send + 'static,
    {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = ImapSession::connect(&config)?;
            let result = op(&mut session);
            session.logout();
            result
        })
        .await
        .map_err(|e| MailStoreError::TaskJoin(e.to_string()))?
    }
}

#[async_trait]
impl MailStore for ImapMailStore {
    async fn search_since(
        &self,
        mailbox: &str,
        since: NaiveDate,
    ) -> Result<Vec<String>, MailStoreError> {
        let mailbox = mailbox.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.search_since(since)
        })
        .await
    }

    async fn fetch(&self, mailbox: &str, id: &str) -> Result<Vec<u8>, MailStoreError> {
        let mailbox = mailbox.to_string();
        let id = id.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.fetch_rfc822(&mailbox, &id)
        })
        .await
    }

    async fn copy(&self, mailbox: &str, id: &str, dest: &str) -> Result<(), MailStoreError> {
        let mailbox = mailbox.to_string();
        let id = id.to_string();
        let dest = dest.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.expect_ok(&format!("COPY {id} \"{dest}\""), "COPY")?;
            Ok(())
        })
        .await
    }

    async fn mark_seen(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError> {
        let mailbox = mailbox.to_string();
        let id = id.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.expect_ok(&format!("STORE {id} +FLAGS (\\Seen)"), "STORE")?;
            Ok(())
        })
        .await
    }

    async fn mark_deleted(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError> {
        let mailbox = mailbox.to_string();
        let id = id.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.expect_ok(&format!("STORE {id} +FLAGS (\\Deleted)"), "STORE")?;
            Ok(())
        })
        .await
    }

    async fn expunge(&self, mailbox: &str) -> Result<(), MailStoreError> {
        let mailbox = mailbox.to_string();
        self.run(move |s| {
            s.select(&mailbox)?;
            s.expect_ok("EXPUNGE", "EXPUNGE")?;
            Ok(())
        })
        .await
    }

    async fn ensure_folders(&self, folders: &[String]) -> Result<(), MailStoreError> {
        let folders = folders.to_vec();
        self.run(move |s| {
            for folder in &folders {
                s.create_idempotent(folder)?;
            }
            Ok(())
        })
        .await
    }
}
