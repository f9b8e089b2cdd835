//! Loopback server: one client, one handshake, then a stream of results.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::codec::{decode_handshake, encode_result};
use crate::{Handshake, Result, TransportError, MAX_HANDSHAKE_LEN};

/// Binds the loopback listener.
pub async fn bind(port: u16) -> Result<TcpListener> {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse => Err(TransportError::PortInUse(port)),
        Err(e) => Err(e.into()),
    }
}

/// Waits for a client, giving up after `idle_timeout`.
pub async fn accept_client(
    listener: &TcpListener,
    idle_timeout: Duration,
) -> Result<(TcpStream, SocketAddr)> {
    match tokio::time::timeout(idle_timeout, listener.accept()).await {
        Ok(accepted) => Ok(accepted?),
        Err(_) => Err(TransportError::IdleTimeout(idle_timeout)),
    }
}

/// Splits a client connection into its inbound and outbound halves.
pub fn split(stream: TcpStream, max_payload_len: usize) -> (ClientReader, ResultWriter) {
    let (read, write) = stream.into_split();
    (
        ClientReader {
            inner: BufReader::new(read),
        },
        ResultWriter {
            inner: write,
            max_payload_len,
        },
    )
}

pub struct ClientReader {
    inner: BufReader<OwnedReadHalf>,
}

impl ClientReader {
    /// Reads the handshake line (or everything up to EOF).
    pub async fn read_handshake(&mut self) -> Result<Handshake> {
        let mut buf = Vec::new();
        let limit = MAX_HANDSHAKE_LEN as u64 + 1;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        if buf.len() > MAX_HANDSHAKE_LEN {
            return Err(TransportError::HandshakeTooLarge(MAX_HANDSHAKE_LEN));
        }
        decode_handshake(&buf)
    }

    /// Resolves once the client closes its side. Anything it sends after the
    /// handshake is ignored.
    pub async fn closed(&mut self) -> Result<()> {
        let mut scratch = [0u8; 512];
        loop {
            let n = self.inner.read(&mut scratch).await?;
            if n == 0 {
                return Ok(());
            }
            tracing::trace!(bytes = n, "ignoring client data after handshake");
        }
    }
}

pub struct ResultWriter {
    inner: OwnedWriteHalf,
    max_payload_len: usize,
}

impl ResultWriter {
    /// Sends one result. Oversized results are dropped with a warning and
    /// reported as `Ok(false)`.
    pub async fn send(&mut self, text: &str) -> Result<bool> {
        let frame = match encode_result(text, self.max_payload_len) {
            Ok(frame) => frame,
            Err(TransportError::PayloadTooLarge { len, max }) => {
                tracing::warn!(len, max, "payload too big to send, dropped");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_handshake;
    use command_grammar::VocabularyEntry;

    async fn pair(max_payload_len: usize) -> anyhow::Result<(TcpStream, ClientReader, ResultWriter)> {
        let listener = bind(0).await?;
        let addr = listener.local_addr()?;
        let client = TcpStream::connect(addr).await?;
        let (stream, _) = accept_client(&listener, Duration::from_secs(2)).await?;
        let (reader, writer) = split(stream, max_payload_len);
        Ok((client, reader, writer))
    }

    #[tokio::test]
    async fn test_handshake_then_results() -> anyhow::Result<()> {
        let (mut client, mut reader, mut writer) = pair(64).await?;
        let handshake = Handshake::new(
            vec![VocabularyEntry::new("subject_all", "guys")],
            vec!["... subject_all".to_string()],
        );
        client.write_all(&encode_handshake(&handshake)?).await?;

        assert_eq!(reader.read_handshake().await?, handshake);

        assert!(writer.send("subject_all").await?);
        assert!(!writer.send(&"x".repeat(64)).await?);
        assert!(writer.send("cmd_stop").await?);

        let mut lines = BufReader::new(&mut client).lines();
        assert_eq!(lines.next_line().await?, Some("subject_all".to_string()));
        assert_eq!(lines.next_line().await?, Some("cmd_stop".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_handshake_without_newline_until_eof() -> anyhow::Result<()> {
        let (mut client, mut reader, _writer) = pair(64).await?;
        client
            .write_all(br#"{"phrases":[],"sentences":["halt"]}"#)
            .await?;
        client.shutdown().await?;
        let handshake = reader.read_handshake().await?;
        assert_eq!(handshake.sentences, vec!["halt".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_garbage_handshake_rejected() -> anyhow::Result<()> {
        let (mut client, mut reader, _writer) = pair(64).await?;
        client.write_all(b"hello there\n").await?;
        assert!(matches!(
            reader.read_handshake().await,
            Err(TransportError::MalformedHandshake(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_resolves_on_disconnect() -> anyhow::Result<()> {
        let (client, mut reader, _writer) = pair(64).await?;
        drop(client);
        assert!(matches!(
            reader.read_handshake().await,
            Err(TransportError::ConnectionClosed)
        ));
        reader.closed().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_accept_times_out() -> anyhow::Result<()> {
        let listener = bind(0).await?;
        let err = accept_client(&listener, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::IdleTimeout(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_port_in_use() -> anyhow::Result<()> {
        let listener = bind(0).await?;
        let port = listener.local_addr()?.port();
        assert!(matches!(bind(port).await, Err(TransportError::PortInUse(p)) if p == port));
        Ok(())
    }
}
