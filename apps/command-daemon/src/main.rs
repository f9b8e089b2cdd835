use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use command_transport::{server, Handshake, TransportError, API_VERSION, MIN_API_VERSION};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use voice_local::{MockHandle, MockRecognizer, RecognitionSession};

mod config;
use config::DaemonConfig;

#[derive(Parser)]
#[command(name = "command-daemon")]
#[command(about = "Voice command host: compiles a client's command grammar and streams recognized commands back")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Loopback port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Seconds to wait for a client before exiting
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Minimum recognition confidence (exclusive)
    #[arg(long)]
    confidence_threshold: Option<f32>,

    /// Recognizer locale tag
    #[arg(long)]
    locale: Option<String>,

    /// Feed the mock recognizer with utterances typed on stdin
    #[arg(long, action = ArgAction::SetTrue)]
    stdin: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<DaemonConfig> {
        let mut config = DaemonConfig::load_or_default(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secs) = self.idle_timeout {
            config.server.idle_timeout_secs = secs;
        }
        if let Some(threshold) = self.confidence_threshold {
            config.recognizer.confidence_threshold = threshold;
        }
        if let Some(locale) = &self.locale {
            config.recognizer.locale = locale.clone();
        }
        Ok(config)
    }
}

/// Why the daemon stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    IdleTimeout,
    ClientClosed,
    Interrupted,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let args = Args::parse();
    let config = args.resolve_config()?;

    info!("Voice command host starting");
    info!("Port: {}", config.server.port);
    info!("Grammar: {} ({})", config.recognizer.grammar_name, config.recognizer.locale);

    let listener = server::bind(config.server.port)
        .await
        .context("starting listener")?;

    let stdin = args.stdin;
    let outcome = serve(listener, config, move |handle| {
        if stdin {
            tokio::spawn(feed_stdin(handle));
        } else {
            warn!("Mock recognizer has no input; pass --stdin to type utterances");
        }
    })
    .await?;

    info!("Voice command host shutting down ({:?})", outcome);
    Ok(())
}

/// Serves one client: handshake, grammar, then results until the client
/// goes away. `attach` receives the mock recognizer's input handle once
/// the session is listening.
async fn serve<F>(listener: TcpListener, config: DaemonConfig, attach: F) -> Result<Outcome>
where
    F: FnOnce(MockHandle),
{
    let idle_timeout = config.server.idle_timeout();
    let (stream, peer) = match server::accept_client(&listener, idle_timeout).await {
        Ok(accepted) => accepted,
        Err(TransportError::IdleTimeout(waited)) => {
            info!("Waited {:?} for a connection, exiting", waited);
            return Ok(Outcome::IdleTimeout);
        }
        Err(e) => return Err(e.into()),
    };
    // One client per process.
    drop(listener);
    info!("New client connected: {}", peer);

    let (mut reader, mut writer) = server::split(stream, config.server.max_payload_len);
    let handshake = reader
        .read_handshake()
        .await
        .context("reading handshake")?;
    check_versions(&handshake);

    let recognizer = MockRecognizer::new(config.recognizer.locale.clone());
    let handle = recognizer.handle();
    let session = RecognitionSession::new(Box::new(recognizer), config.recognizer.clone());
    info!("Session {}", session.id());

    let grammar = session
        .compiler()?
        .compile_templates(&handshake.phrases, &handshake.sentences)
        .context("compiling grammar")?;
    session.load(grammar)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    session.start(move |text| {
        let _ = tx.send(text);
    })?;
    attach(handle);

    let outcome = loop {
        tokio::select! {
            Some(text) = rx.recv() => {
                match writer.send(&text).await {
                    Ok(true) => debug!("Sent: {}", text),
                    Ok(false) => {}
                    Err(e) => {
                        error!("Sending result failed: {}", e);
                        break Outcome::ClientClosed;
                    }
                }
            }
            closed = reader.closed() => {
                if let Err(e) = closed {
                    warn!("Client read error: {}", e);
                }
                info!("Lost connection, exiting");
                break Outcome::ClientClosed;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break Outcome::Interrupted;
            }
        }
    };

    session.stop()?;
    Ok(outcome)
}

fn check_versions(handshake: &Handshake) {
    info!(
        "Client API version {} (min {}), host API version {} (min {})",
        handshake.api_version, handshake.min_api_version, API_VERSION, MIN_API_VERSION
    );
    if !handshake.is_compatible() {
        warn!("Client and host API versions look incompatible, continuing anyway");
    }
    info!(
        "Handshake: {} phrases, {} sentences",
        handshake.phrases.len(),
        handshake.sentences.len()
    );
}

async fn feed_stdin(handle: MockHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !handle.say(line) {
                    info!("Not recognized: {}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("stdin read error: {}", e);
                break;
            }
        }
    }
    debug!("stdin closed");
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_transport::encode_handshake;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use command_grammar::VocabularyEntry;

    const WAIT: Duration = Duration::from_secs(5);

    fn test_config(idle_timeout_secs: u64) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.server.idle_timeout_secs = idle_timeout_secs;
        config
    }

    fn subject_handshake() -> Handshake {
        Handshake::new(
            vec![
                VocabularyEntry::new("subject_all", "all"),
                VocabularyEntry::new("subject_all", "guys"),
            ],
            vec!["... subject_all".to_string()],
        )
    }

    #[tokio::test]
    async fn test_idle_timeout_exits_cleanly() -> anyhow::Result<()> {
        let listener = server::bind(0).await?;
        let outcome = serve(listener, test_config(0), |_| {}).await?;
        assert_eq!(outcome, Outcome::IdleTimeout);
        Ok(())
    }

    #[tokio::test]
    async fn test_results_stream_until_client_leaves() -> anyhow::Result<()> {
        let listener = server::bind(0).await?;
        let addr = listener.local_addr()?;
        let (handle_tx, handle_rx) = oneshot::channel();
        let daemon = tokio::spawn(serve(listener, test_config(5), move |handle| {
            let _ = handle_tx.send(handle);
        }));

        let mut client = TcpStream::connect(addr).await?;
        client.write_all(&encode_handshake(&subject_handshake())?).await?;
        let handle = tokio::time::timeout(WAIT, handle_rx).await??;

        assert!(handle.say("alright guys"));
        let mut lines = BufReader::new(&mut client).lines();
        let line = tokio::time::timeout(WAIT, lines.next_line()).await??;
        assert_eq!(line.as_deref(), Some("subject_all"));

        drop(lines);
        drop(client);
        let outcome = tokio::time::timeout(WAIT, daemon).await???;
        assert_eq!(outcome, Outcome::ClientClosed);
        assert!(!handle.say("alright guys"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_handshake_ends_session() -> anyhow::Result<()> {
        let listener = server::bind(0).await?;
        let addr = listener.local_addr()?;
        let (handle_tx, mut handle_rx) = oneshot::channel();
        let daemon = tokio::spawn(serve(listener, test_config(5), move |handle| {
            let _ = handle_tx.send(handle);
        }));

        let mut client = TcpStream::connect(addr).await?;
        client.write_all(b"hello there\n").await?;

        let err = tokio::time::timeout(WAIT, daemon).await??.unwrap_err();
        assert!(err.to_string().contains("reading handshake"));
        assert!(handle_rx.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "command-daemon",
            "--port",
            "9000",
            "--confidence-threshold",
            "0.8",
            "--locale",
            "en-GB",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.idle_timeout_secs, 10);
        assert_eq!(config.recognizer.confidence_threshold, 0.8);
        assert_eq!(config.recognizer.locale, "en-GB");
        assert!(!args.stdin);
    }
}
