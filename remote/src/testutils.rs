//! Scripted in-process FTP server for tests.
//!
//! Speaks just enough of RFC 959 for [`crate::connect`] and [`crate::Session`]: login,
//! `OPTS UTF8`, `TYPE`, `PASV`, `CWD`, `RETR`, `NOOP` and `QUIT`. Every command line it
//! receives is recorded, and it counts `QUIT`s and finished control connections so tests
//! can assert that a client released its session.

use futures::{SinkExt, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

use crate::protocol;

#[derive(Debug, Clone, Default)]
pub struct MockFtpServerBuilder {
    accounts: Vec<(String, String)>,
    files: BTreeMap<String, Vec<u8>>,
    directories: BTreeSet<String>,
    failing: BTreeSet<String>,
    aborted: BTreeSet<String>,
    reject_utf8: bool,
    silent: bool,
}

impl MockFtpServerBuilder {
    /// Accept only this user/password pair (may be called repeatedly). Without any account
    /// every login succeeds.
    #[must_use]
    pub fn account(mut self, user: &str, password: &str) -> Self {
        self.accounts.push((user.to_string(), password.to_string()));
        self
    }

    /// Serve `contents` at the absolute remote `path`; its parent directories exist.
    #[must_use]
    pub fn file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let path = normalize(path);
        self.add_parents(&path);
        self.files.insert(path, contents.into());
        self
    }

    #[must_use]
    pub fn directory(mut self, path: &str) -> Self {
        let path = normalize(path);
        self.add_parents(&path);
        self.directories.insert(path);
        self
    }

    /// `RETR` of `path` is answered with 550.
    #[must_use]
    pub fn failing_file(mut self, path: &str) -> Self {
        let path = normalize(path);
        self.add_parents(&path);
        self.failing.insert(path);
        self
    }

    /// `RETR` of `path` sends half of `contents` and then 426.
    #[must_use]
    pub fn aborted_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let mut builder = self.file(path, contents);
        builder.aborted.insert(normalize(path));
        builder
    }

    /// Answer `OPTS UTF8 ON` with 502.
    #[must_use]
    pub fn reject_utf8(mut self) -> Self {
        self.reject_utf8 = true;
        self
    }

    /// Accept connections but never send a greeting.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut parent = std::path::Path::new(path).parent();
        while let Some(dir) = parent {
            self.directories.insert(normalize(&dir.to_string_lossy()));
            parent = dir.parent();
        }
    }

    fn accepts(&self, user: &str, password: &str) -> bool {
        self.accounts.is_empty()
            || self
                .accounts
                .iter()
                .any(|(known_user, known_password)| known_user == user && known_password == password)
    }

    pub async fn start(self) -> anyhow::Result<MockFtpServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let (closed_tx, closed_rx) = tokio::sync::watch::channel(0usize);
        let state = std::sync::Arc::new(ServerState {
            script: self,
            commands: std::sync::Mutex::new(vec![]),
            quits: AtomicUsize::new(0),
            closed: closed_tx,
        });
        let task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(error) = serve(stream, &state).await {
                            tracing::debug!("mock ftp session ended with error: {:#}", error);
                        }
                        state.closed.send_modify(|count| *count += 1);
                    });
                }
            })
        };
        Ok(MockFtpServer {
            address,
            state,
            closed: closed_rx,
            task,
        })
    }
}

#[derive(Debug)]
struct ServerState {
    script: MockFtpServerBuilder,
    commands: std::sync::Mutex<Vec<String>>,
    quits: AtomicUsize,
    closed: tokio::sync::watch::Sender<usize>,
}

impl ServerState {
    fn record(&self, line: &str) {
        self.commands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Running mock server. Stops accepting connections when dropped.
#[derive(Debug)]
pub struct MockFtpServer {
    address: std::net::SocketAddr,
    state: std::sync::Arc<ServerState>,
    closed: tokio::sync::watch::Receiver<usize>,
    task: tokio::task::JoinHandle<()>,
}

impl MockFtpServer {
    #[must_use]
    pub fn builder() -> MockFtpServerBuilder {
        MockFtpServerBuilder::default()
    }

    #[must_use]
    pub fn address(&self) -> std::net::SocketAddr {
        self.address
    }

    #[must_use]
    pub fn host(&self) -> String {
        self.address.ip().to_string()
    }

    #[must_use]
    pub fn port(&self) -> String {
        self.address.port().to_string()
    }

    /// Command lines received so far, across all sessions, in arrival order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.state
            .commands
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn quit_count(&self) -> usize {
        self.state.quits.load(Ordering::SeqCst)
    }

    /// Control connections that have ended, by `QUIT` or by the client closing the socket.
    #[must_use]
    pub fn closed_sessions(&self) -> usize {
        *self.closed.borrow()
    }

    /// Waits until at least `sessions` control connections have ended.
    pub async fn wait_closed(&self, sessions: usize) -> anyhow::Result<()> {
        let mut closed = self.closed.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            closed.wait_for(|count| *count >= sessions),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "only {} of {} sessions closed",
                self.closed_sessions(),
                sessions
            )
        })??;
        Ok(())
    }
}

impl Drop for MockFtpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = vec![];
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

fn resolve(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else {
        normalize(&format!("{cwd}/{path}"))
    }
}

type Control = Framed<TcpStream, LinesCodec>;

async fn reply(control: &mut Control, code: u16, text: &str) -> anyhow::Result<()> {
    control.send(format!("{code} {text}\r")).await?;
    Ok(())
}

struct SessionState {
    user: String,
    logged_in: bool,
    cwd: String,
    passive: Option<TcpListener>,
}

async fn serve(stream: TcpStream, state: &ServerState) -> anyhow::Result<()> {
    let script = &state.script;
    let mut control = Framed::new(stream, LinesCodec::new());
    if script.silent {
        while control.next().await.is_some() {}
        return Ok(());
    }
    reply(&mut control, 220, "mock ftp ready").await?;
    let mut session = SessionState {
        user: String::new(),
        logged_in: false,
        cwd: "/".to_string(),
        passive: None,
    };
    while let Some(line) = control.next().await {
        let line = line?;
        state.record(&line);
        let (verb, argument) = match line.split_once(' ') {
            Some((verb, argument)) => (verb.to_ascii_uppercase(), argument.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };
        match verb.as_str() {
            "USER" => {
                session.user = argument;
                session.logged_in = false;
                reply(&mut control, 331, "Please specify the password.").await?;
            }
            "PASS" => {
                if script.accepts(&session.user, &argument) {
                    session.logged_in = true;
                    reply(&mut control, 230, "Login successful.").await?;
                } else {
                    reply(&mut control, 530, "Login incorrect.").await?;
                }
            }
            "QUIT" => {
                state.quits.fetch_add(1, Ordering::SeqCst);
                reply(&mut control, 221, "Goodbye.").await?;
                return Ok(());
            }
            _ if !session.logged_in => {
                reply(&mut control, 530, "Please login with USER and PASS.").await?;
            }
            "OPTS" if argument.eq_ignore_ascii_case("UTF8 ON") && !script.reject_utf8 => {
                reply(&mut control, 200, "Always in UTF8 mode.").await?;
            }
            "TYPE" => reply(&mut control, 200, "Switching to Binary mode.").await?,
            "NOOP" => reply(&mut control, 200, "NOOP ok.").await?,
            "CWD" => {
                let target = resolve(&session.cwd, &argument);
                if script.directories.contains(&target) {
                    session.cwd = target;
                    reply(&mut control, 250, "Directory successfully changed.").await?;
                } else {
                    reply(&mut control, 550, "Failed to change directory.").await?;
                }
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let std::net::SocketAddr::V4(address) = listener.local_addr()? else {
                    anyhow::bail!("mock data listener is not IPv4");
                };
                session.passive = Some(listener);
                reply(&mut control, 227, &protocol::format_pasv(address)).await?;
            }
            "RETR" => {
                let path = resolve(&session.cwd, &argument);
                retrieve(&mut control, script, session.passive.take(), &path).await?;
            }
            _ => reply(&mut control, 502, "Command not implemented.").await?,
        }
    }
    Ok(())
}

async fn retrieve(
    control: &mut Control,
    script: &MockFtpServerBuilder,
    passive: Option<TcpListener>,
    path: &str,
) -> anyhow::Result<()> {
    let Some(listener) = passive else {
        return reply(control, 425, "Use PASV first.").await;
    };
    let contents = match script.files.get(path) {
        Some(contents) if !script.failing.contains(path) => contents,
        _ => return reply(control, 550, "Failed to open file.").await,
    };
    let (mut data, _) = listener.accept().await?;
    reply(control, 150, "Opening BINARY mode data connection.").await?;
    if script.aborted.contains(path) {
        data.write_all(&contents[..contents.len() / 2]).await?;
        data.shutdown().await?;
        drop(data);
        return reply(control, 426, "Connection closed; transfer aborted.").await;
    }
    data.write_all(contents).await?;
    data.shutdown().await?;
    drop(data);
    reply(control, 226, "Transfer complete.").await
}
