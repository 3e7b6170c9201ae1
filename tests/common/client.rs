//! Test clients for the trigger and control sockets.

use fmac_proto::{ControlReply, ReplyLine, TriggerClientCodec, TriggerReply};
use futures_util::{SinkExt, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// A caller submitting signed challenges.
pub struct TriggerClient {
    framed: Framed<UnixStream, TriggerClientCodec>,
}

impl TriggerClient {
    pub async fn connect(path: &Path) -> anyhow::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self {
            framed: Framed::new(stream, TriggerClientCodec::default()),
        })
    }

    /// Submit one challenge and wait for the verdict.
    pub async fn submit(&mut self, signature: &[u8]) -> anyhow::Result<TriggerReply> {
        self.framed.send(signature).await?;
        match timeout(REPLY_TIMEOUT, self.framed.next()).await? {
            Some(reply) => Ok(reply?),
            None => anyhow::bail!("trigger socket closed"),
        }
    }

    /// Whether the daemon has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        matches!(
            timeout(REPLY_TIMEOUT, self.framed.next()).await,
            Ok(None) | Ok(Some(Err(_)))
        )
    }

    /// Send raw bytes, bypassing framing.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.framed.get_mut().write_all(bytes).await?;
        Ok(())
    }
}

/// An administrator on the control socket.
pub struct ControlClient {
    framed: Framed<UnixStream, LinesCodec>,
}

impl ControlClient {
    pub async fn connect(path: &Path) -> anyhow::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
        })
    }

    /// Send one command and collect its reply.
    pub async fn command(&mut self, line: &str) -> anyhow::Result<ControlReply> {
        self.framed.send(line).await?;
        let mut data = Vec::new();
        loop {
            let line = match timeout(REPLY_TIMEOUT, self.framed.next()).await? {
                Some(line) => line?,
                None => anyhow::bail!("control socket closed"),
            };
            match ReplyLine::parse(&line) {
                Some(ReplyLine::Data(text)) => data.push(text.to_string()),
                Some(ReplyLine::Ok) => return Ok(ControlReply::Ok(data)),
                Some(ReplyLine::Err(reason)) => return Ok(ControlReply::Err(reason.to_string())),
                None => anyhow::bail!("unexpected reply line {line:?}"),
            }
        }
    }

    /// Send a command expecting success; returns its data lines.
    pub async fn ok(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        match self.command(line).await? {
            ControlReply::Ok(data) => Ok(data),
            ControlReply::Err(reason) => anyhow::bail!("{line:?} failed: {reason}"),
        }
    }
}
