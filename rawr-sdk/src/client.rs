//! IRC client connection.
//!
//! This is the main entry point for SDK consumers. It manages the TCP
//! connection, IRC registration and keepalive, and emits events.
//! Supports both plaintext and TLS connections.
//!
//! ## Reconnection
//!
//! [`connect_with_stream`] runs a single session. Bots should use
//! [`run_with_reconnect`], which retries with exponential backoff
//! (2→4→8→16→30s cap) and rejoins channels after every registration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls;

use crate::event::Event;
use crate::irc::{self, Message};

/// Configuration for connecting to an IRC server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address (host:port).
    pub server_addr: String,
    /// Desired nickname.
    pub nick: String,
    /// Username (ident).
    pub user: String,
    /// Real name.
    pub realname: String,
    /// Server password sent with PASS before registration.
    pub password: Option<String>,
    /// Use TLS.
    pub tls: bool,
    /// Skip TLS certificate verification (for self-signed certs).
    pub tls_insecure: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:6667".to_string(),
            nick: "rawrbot".to_string(),
            user: "rawrbot".to_string(),
            realname: "rawrbot".to_string(),
            password: None,
            tls: false,
            tls_insecure: false,
        }
    }
}

impl ConnectConfig {
    /// TLS is used when requested or when the port is the conventional TLS port.
    pub fn use_tls(&self) -> bool {
        self.tls || self.server_addr.ends_with(":6697")
    }
}

/// Commands the consumer can send to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(String),
    Part(String),
    Privmsg { target: String, text: String },
    Notice { target: String, text: String },
    Raw(String),
    Quit(Option<String>),
}

/// A handle to a running IRC client connection.
#[derive(Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl ClientHandle {
    /// Build a handle around an existing command channel.
    ///
    /// Lets a consumer drive a bot without a live connection and inspect
    /// what it would have sent.
    pub fn from_sender(cmd_tx: mpsc::Sender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub async fn join(&self, channel: &str) -> Result<()> {
        self.cmd_tx.send(Command::Join(channel.to_string())).await?;
        Ok(())
    }

    pub async fn part(&self, channel: &str) -> Result<()> {
        self.cmd_tx.send(Command::Part(channel.to_string())).await?;
        Ok(())
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Command::Privmsg {
                target: target.to_string(),
                text: irc::sanitize(text),
            })
            .await?;
        Ok(())
    }

    /// Send a CTCP ACTION (third-person emote).
    pub async fn action(&self, target: &str, text: &str) -> Result<()> {
        self.privmsg(target, &irc::ctcp_action(&irc::sanitize(text))).await
    }

    pub async fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Command::Notice {
                target: target.to_string(),
                text: irc::sanitize(text),
            })
            .await?;
        Ok(())
    }

    pub async fn quit(&self, message: Option<&str>) -> Result<()> {
        self.cmd_tx
            .send(Command::Quit(message.map(|s| s.to_string())))
            .await?;
        Ok(())
    }

    pub async fn raw(&self, line: &str) -> Result<()> {
        self.cmd_tx.send(Command::Raw(irc::sanitize(line))).await?;
        Ok(())
    }
}

/// Establish TCP (and optionally TLS) connection to the server.
///
/// Done before the protocol task starts so that connection errors
/// surface to the caller directly.
pub async fn establish_connection(config: &ConnectConfig) -> Result<EstablishedConnection> {
    let use_tls = config.use_tls();
    let mode = if use_tls { "TLS" } else { "plain" };

    tracing::debug!("Resolving {}...", config.server_addr);
    let tcp = TcpStream::connect(&config.server_addr)
        .await
        .map_err(|e| anyhow::anyhow!("TCP connect to {} failed: {e}", config.server_addr))?;
    tracing::debug!("TCP connected to {} ({mode})", config.server_addr);

    if use_tls {
        let tls_config = if config.tls_insecure {
            tracing::debug!("TLS: insecure mode (skipping cert verification)");
            rustls_insecure_config()
        } else {
            tracing::debug!("TLS: verifying server certificate...");
            rustls_default_config()
        };
        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = config
            .server_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&config.server_addr);
        let dns_name = rustls::pki_types::ServerName::try_from(server_name.to_string())?;
        let tls_stream = connector
            .connect(dns_name, tcp)
            .await
            .map_err(|e| anyhow::anyhow!("TLS handshake with {} failed: {e}", config.server_addr))?;
        tracing::debug!("TLS handshake complete");
        Ok(EstablishedConnection::Tls(Box::new(tls_stream)))
    } else {
        Ok(EstablishedConnection::Plain(tcp))
    }
}

/// A connection that has completed TCP (and optionally TLS) but hasn't
/// started IRC registration yet.
pub enum EstablishedConnection {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// Connect using an already-established connection.
///
/// Returns a handle for sending commands and a receiver for events.
/// The IRC protocol runs in a spawned task.
pub fn connect_with_stream(
    conn: EstablishedConnection,
    config: ConnectConfig,
) -> (ClientHandle, mpsc::Receiver<Event>) {
    let (event_tx, event_rx) = mpsc::channel(4096);
    let (cmd_tx, cmd_rx) = mpsc::channel(256);

    let handle = ClientHandle { cmd_tx };

    tokio::spawn(async move {
        let _ = event_tx.send(Event::Connected).await;
        let result = match conn {
            EstablishedConnection::Plain(tcp) => {
                let (reader, writer) = tokio::io::split(tcp);
                run_irc(BufReader::new(reader), writer, &config, event_tx.clone(), cmd_rx).await
            }
            EstablishedConnection::Tls(tls) => {
                let (reader, writer) = tokio::io::split(*tls);
                run_irc(BufReader::new(reader), writer, &config, event_tx.clone(), cmd_rx).await
            }
        };
        if let Err(e) = result {
            let _ = event_tx
                .send(Event::Disconnected {
                    reason: e.to_string(),
                })
                .await;
        }
    });

    (handle, event_rx)
}

fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn rustls_default_config() -> rustls::ClientConfig {
    install_crypto_provider();

    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

fn rustls_insecure_config() -> rustls::ClientConfig {
    install_crypto_provider();
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
        .with_no_client_auth()
}

#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Translate a parsed server line into a consumer event.
///
/// Stateful replies (PING, nick collisions, welcome) are handled by the
/// protocol loop; this covers everything that is a plain notification.
pub fn translate(msg: &Message) -> Option<Event> {
    let nick = || msg.nick().unwrap_or("").to_string();
    let param = |i: usize| msg.params.get(i).cloned().unwrap_or_default();

    match msg.command.as_str() {
        "JOIN" => Some(Event::Joined {
            channel: param(0),
            nick: nick(),
        }),
        "PART" => Some(Event::Parted {
            channel: param(0),
            nick: nick(),
        }),
        "KICK" if msg.params.len() >= 2 => Some(Event::Kicked {
            channel: param(0),
            nick: param(1),
            by: nick(),
            reason: param(2),
        }),
        "INVITE" if msg.params.len() >= 2 => Some(Event::Invited {
            channel: param(1),
            by: nick(),
        }),
        "NICK" => Some(Event::NickChanged {
            old_nick: nick(),
            new_nick: param(0),
        }),
        "QUIT" => Some(Event::UserQuit {
            nick: nick(),
            reason: param(0),
        }),
        "PRIVMSG" | "NOTICE" if msg.params.len() >= 2 => {
            let text = param(1);
            if !msg.from_user() {
                // Server NOTICE (no hostmask in prefix)
                return Some(Event::ServerNotice { text });
            }
            let from = nick();
            let target = param(0);
            if let Some(action) = irc::parse_ctcp_action(&text) {
                return Some(Event::Action {
                    from,
                    target,
                    text: action.to_string(),
                });
            }
            if msg.command == "NOTICE" {
                return None;
            }
            Some(Event::Message { from, target, text })
        }
        "ERROR" => Some(Event::ServerNotice {
            text: msg.params.join(" "),
        }),
        other => {
            // Surface server error numerics so operators see why a JOIN failed.
            let num = other.parse::<u16>().ok()?;
            if (400..600).contains(&num) {
                let text = if msg.params.len() > 1 {
                    msg.params[1..].join(" ")
                } else {
                    msg.params.join(" ")
                };
                Some(Event::ServerNotice { text })
            } else {
                None
            }
        }
    }
}

async fn run_irc<R, W>(
    reader: R,
    writer: W,
    config: &ConnectConfig,
    event_tx: mpsc::Sender<Event>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin,
{
    // Lines are read in their own task so a half-received line is never
    // dropped when the session loop wakes up for something else.
    let (line_tx, line_rx) = mpsc::channel(256);
    let read_handle = tokio::spawn(read_lines(reader, line_tx));
    let result = irc_session(line_rx, writer, config, event_tx, cmd_rx).await;
    read_handle.abort();
    result
}

/// Forward complete lines from `reader` until EOF or a read error.
async fn read_lines<R>(mut reader: R, line_tx: mpsc::Sender<std::io::Result<String>>)
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if line_tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = line_tx.send(Err(e)).await;
                break;
            }
        }
    }
}

async fn irc_session<W>(
    mut line_rx: mpsc::Receiver<std::io::Result<String>>,
    mut writer: W,
    config: &ConnectConfig,
    event_tx: mpsc::Sender<Event>,
    mut cmd_rx: mpsc::Receiver<Command>,
) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    if let Some(password) = &config.password {
        send_line(&mut writer, &format!("PASS {password}")).await?;
    }
    send_line(&mut writer, &format!("NICK {}", config.nick)).await?;
    send_line(
        &mut writer,
        &format!("USER {} 0 * :{}", config.user, config.realname),
    )
    .await?;

    let mut registered = false;
    let mut nick_tries: u32 = 0;
    let mut pending_commands: Vec<Command> = Vec::new();
    let mut last_activity = tokio::time::Instant::now();
    let mut keepalive_sent = false;
    let ping_interval = Duration::from_secs(60);
    let ping_timeout = Duration::from_secs(120);

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else {
                    let _ = event_tx.send(Event::Disconnected { reason: "EOF".to_string() }).await;
                    break;
                };
                let line = line?;

                last_activity = tokio::time::Instant::now();
                keepalive_sent = false;
                let raw = line.trim_end().to_string();
                tracing::trace!(line = %raw, "<<");
                let _ = event_tx.send(Event::RawLine(raw)).await;

                if let Some(msg) = Message::parse(&line) {
                    match msg.command.as_str() {
                        "PING" => {
                            let token = msg.params.first().cloned().unwrap_or_default();
                            send_line(&mut writer, &format!("PONG :{token}")).await?;
                        }
                        // RPL_WELCOME
                        "001" => {
                            registered = true;
                            let nick = msg.params.first().cloned().unwrap_or_else(|| config.nick.clone());
                            let _ = event_tx.send(Event::Registered { nick }).await;
                            for cmd in pending_commands.drain(..) {
                                execute_command(&mut writer, cmd).await?;
                            }
                        }
                        // ERR_NICKNAMEINUSE
                        "433" if !registered => {
                            nick_tries = nick_tries.saturating_add(1);
                            if nick_tries <= 5 {
                                let alt = format!("{}{}", config.nick, nick_tries);
                                tracing::info!(nick = %alt, "Nick in use, retrying");
                                send_line(&mut writer, &format!("NICK {alt}")).await?;
                            } else {
                                // Give up; let reconnect logic handle it.
                                let _ = event_tx.send(Event::Disconnected { reason: "Nick in use".to_string() }).await;
                                break;
                            }
                        }
                        _ => {
                            if let Some(event) = translate(&msg) {
                                let _ = event_tx.send(event).await;
                            }
                            if msg.command == "ERROR" {
                                let reason = msg.params.join(" ");
                                let _ = event_tx.send(Event::Disconnected { reason }).await;
                                break;
                            }
                        }
                    }
                }
            }
            Some(cmd) = cmd_rx.recv() => {
                let quitting = matches!(cmd, Command::Quit(_));
                if registered || quitting {
                    execute_command(&mut writer, cmd).await?;
                    if quitting && !registered {
                        break; // Quit before registration
                    }
                } else {
                    // Queue until registered
                    pending_commands.push(cmd);
                }
            }
            // Client-to-server PING after silence, then timeout if still silent
            _ = tokio::time::sleep_until(
                last_activity + if keepalive_sent { ping_timeout } else { ping_interval }
            ) => {
                if keepalive_sent {
                    let _ = event_tx.send(Event::Disconnected { reason: "Ping timeout".to_string() }).await;
                    break;
                }
                send_line(&mut writer, "PING :keepalive").await?;
                keepalive_sent = true;
            }
        }
    }

    Ok(())
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    tracing::trace!(line = %line, ">>");
    writer.write_all(format!("{line}\r\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Execute a single IRC command on the wire.
async fn execute_command<W: AsyncWrite + Unpin>(writer: &mut W, cmd: Command) -> Result<()> {
    let line = match cmd {
        Command::Join(channel) => Message::new("JOIN", vec![channel]).to_string(),
        Command::Part(channel) => Message::new("PART", vec![channel]).to_string(),
        Command::Privmsg { target, text } => {
            format!("PRIVMSG {target} :{text}")
        }
        Command::Notice { target, text } => {
            format!("NOTICE {target} :{text}")
        }
        Command::Raw(line) => line,
        Command::Quit(msg) => match msg {
            Some(m) => format!("QUIT :{m}"),
            None => "QUIT".to_string(),
        },
    };
    send_line(writer, &line).await
}

// ── Reconnect helper ──

/// Configuration for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,
    /// Channels to join after every registration.
    pub channels: Vec<String>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            channels: Vec::new(),
        }
    }
}

impl ReconnectConfig {
    /// Delay to use after `current`: multiplied, jittered by up to a quarter, capped.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let base = current.as_millis() as u64;
        let jitter = rand_jitter(base / 4);
        let grown = (base as f64 * self.backoff_factor) as u64 + jitter;
        Duration::from_millis(grown.min(self.max_delay.as_millis() as u64))
    }
}

/// Run an event loop with automatic reconnection.
///
/// The `handler` is called for each event. When disconnected, the loop
/// reconnects with exponential backoff and rejoins configured channels.
/// Handler errors are logged and do not stop the loop.
pub async fn run_with_reconnect<F>(
    config: ConnectConfig,
    reconnect_config: ReconnectConfig,
    handler: F,
) -> Result<()>
where
    F: Fn(ClientHandle, Event) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
{
    let mut delay = reconnect_config.initial_delay;
    let mut consecutive_failures = 0u32;

    loop {
        let conn = match establish_connection(&config).await {
            Ok(c) => {
                consecutive_failures = 0;
                delay = reconnect_config.initial_delay;
                c
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    error = %e,
                    attempt = consecutive_failures,
                    delay_secs = delay.as_secs(),
                    "Connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = reconnect_config.next_delay(delay);
                continue;
            }
        };

        let (handle, mut events) = connect_with_stream(conn, config.clone());

        while let Some(event) = events.recv().await {
            // JOINs sent before registration are dropped by servers, so wait for 001.
            if matches!(&event, Event::Registered { .. }) {
                for ch in &reconnect_config.channels {
                    if let Err(e) = handle.join(ch).await {
                        tracing::warn!(channel = %ch, error = %e, "Join failed");
                    }
                }
            }
            let disconnected = matches!(&event, Event::Disconnected { .. });
            if let Err(e) = handler(handle.clone(), event).await {
                tracing::error!(error = %e, "Handler error");
            }
            if disconnected {
                break;
            }
        }

        tracing::info!(delay_secs = delay.as_secs(), "Disconnected, will reconnect");
        tokio::time::sleep(delay).await;
        delay = reconnect_config.next_delay(delay);
    }
}

/// Random value in `0..max`.
fn rand_jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn parsed(line: &str) -> Message {
        Message::parse(line).unwrap()
    }

    #[test]
    fn translate_channel_message() {
        let event = translate(&parsed(":alice!a@h PRIVMSG #rawr :rawrbot: foo")).unwrap();
        assert_eq!(
            event,
            Event::Message {
                from: "alice".into(),
                target: "#rawr".into(),
                text: "rawrbot: foo".into(),
            }
        );
    }

    #[test]
    fn translate_action() {
        let event = translate(&parsed(":alice!a@h PRIVMSG #rawr :\x01ACTION waves\x01")).unwrap();
        assert_eq!(
            event,
            Event::Action {
                from: "alice".into(),
                target: "#rawr".into(),
                text: "waves".into(),
            }
        );
    }

    #[test]
    fn translate_server_notice_and_user_notice() {
        let event = translate(&parsed(":irc.example.org NOTICE * :Looking up your hostname")).unwrap();
        assert!(matches!(event, Event::ServerNotice { .. }));
        assert!(translate(&parsed(":bob!b@h NOTICE rawrbot :psst")).is_none());
    }

    #[test]
    fn translate_kick_and_error_numeric() {
        let event = translate(&parsed(":op!o@h KICK #rawr rawrbot :bye")).unwrap();
        assert_eq!(
            event,
            Event::Kicked {
                channel: "#rawr".into(),
                nick: "rawrbot".into(),
                by: "op".into(),
                reason: "bye".into(),
            }
        );
        let event = translate(&parsed(":irc 473 rawrbot #secret :Cannot join channel (+i)")).unwrap();
        assert_eq!(
            event,
            Event::ServerNotice {
                text: "#secret Cannot join channel (+i)".into()
            }
        );
        assert!(translate(&parsed(":irc 372 rawrbot :- motd")).is_none());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let rc = ReconnectConfig::default();
        let next = rc.next_delay(Duration::from_secs(2));
        assert!(next >= Duration::from_secs(4) && next <= Duration::from_secs(5));
        let capped = rc.next_delay(Duration::from_secs(30));
        assert_eq!(capped, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn registers_answers_ping_and_flushes_queued_commands() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let mut server_lines = BufReader::new(server_read).lines();

        let (event_tx, mut event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let config = ConnectConfig {
            password: Some("hunter2".into()),
            ..Default::default()
        };

        let task = tokio::spawn(async move {
            run_irc(BufReader::new(client_read), client_write, &config, event_tx, cmd_rx).await
        });

        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "PASS hunter2");
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "NICK rawrbot");
        assert_eq!(
            server_lines.next_line().await.unwrap().unwrap(),
            "USER rawrbot 0 * :rawrbot"
        );

        // Queued before registration.
        let handle = ClientHandle::from_sender(cmd_tx);
        handle.join("#rawr").await.unwrap();

        server_write.write_all(b"PING :abc\r\n").await.unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "PONG :abc");

        server_write
            .write_all(b":irc 001 rawrbot :Welcome\r\n")
            .await
            .unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "JOIN #rawr");

        handle.action("#rawr", "waves").await.unwrap();
        assert_eq!(
            server_lines.next_line().await.unwrap().unwrap(),
            "PRIVMSG #rawr :\x01ACTION waves\x01"
        );

        let mut saw_registered = false;
        while let Ok(event) = event_rx.try_recv() {
            if event == (Event::Registered { nick: "rawrbot".into() }) {
                saw_registered = true;
            }
        }
        assert!(saw_registered);

        drop(server_write);
        drop(server_lines);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn nick_collision_retries_with_suffix() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let mut server_lines = BufReader::new(server_read).lines();

        let (event_tx, _event_rx) = mpsc::channel(64);
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let config = ConnectConfig::default();

        let task = tokio::spawn(async move {
            run_irc(BufReader::new(client_read), client_write, &config, event_tx, cmd_rx).await
        });

        server_lines.next_line().await.unwrap();
        server_lines.next_line().await.unwrap();
        server_write
            .write_all(b":irc 433 * rawrbot :Nickname is already in use\r\n")
            .await
            .unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "NICK rawrbot1");

        drop(server_write);
        drop(server_lines);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn split_line_survives_outbound_command() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let mut server_lines = BufReader::new(server_read).lines();

        let (event_tx, _event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let config = ConnectConfig::default();

        let task = tokio::spawn(async move {
            run_irc(BufReader::new(client_read), client_write, &config, event_tx, cmd_rx).await
        });

        server_lines.next_line().await.unwrap();
        server_lines.next_line().await.unwrap();
        server_write
            .write_all(b":irc 001 rawrbot :Welcome\r\n")
            .await
            .unwrap();

        // First half of a line, then a command goes out before the rest arrives.
        server_write.write_all(b"PING :abc").await.unwrap();
        tokio::task::yield_now().await;
        let handle = ClientHandle::from_sender(cmd_tx);
        handle.privmsg("#rawr", "hi").await.unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "PRIVMSG #rawr :hi");

        server_write.write_all(b"def\r\n").await.unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "PONG :abcdef");

        drop(server_write);
        drop(server_lines);
        task.await.unwrap().unwrap();
    }
}
