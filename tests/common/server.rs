//! Scripted fake IRC server.
//!
//! Listens on an ephemeral loopback port. Each accepted connection is a
//! [`ServerPeer`] the test drives line by line.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A listening fake server.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (stream, _) = timeout(STEP_TIMEOUT, self.listener.accept()).await??;
        Ok(ServerPeer::new(stream))
    }
}

/// Server side of one bot connection.
pub struct ServerPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl ServerPeer {
    fn new(stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    /// Send one line, adding the terminator.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the bot, without its terminator.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(STEP_TIMEOUT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("bot closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive a line and check it.
    pub async fn expect(&mut self, expected: &str) -> anyhow::Result<()> {
        let line = self.recv().await?;
        anyhow::ensure!(line == expected, "expected {expected:?}, got {line:?}");
        Ok(())
    }

    /// Consume the registration handshake of a bot configured by
    /// [`config_for`](super::config_for).
    pub async fn expect_handshake(&mut self) -> anyhow::Result<()> {
        self.expect("USER bot * * :bot").await?;
        self.expect("NICK bot").await
    }

    /// Confirm registration.
    pub async fn welcome(&mut self) -> anyhow::Result<()> {
        self.send(":irc.test 001 bot :Welcome to the test network").await
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
