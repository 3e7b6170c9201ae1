//! Connection tasks for the trigger and control sockets.
//!
//! ```text
//! trigger:  [len:u16][signature] ──► deliver ──► [tag][grant?]
//! control:  "add /data 1000 1 open\n" ──► handle_line ──► "- ...\n" * "OK\n"
//! ```
//!
//! Trigger peers are re-identified from the socket credentials for every
//! frame. When the last trigger connection of a process closes, its
//! capability handles and its privilege record go with it.

use fmac_proto::command::MAX_LINE_LEN;
use fmac_proto::{ControlReply, FrameError, TriggerCodec};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{Instrument, debug, info, warn};

use crate::caller::CallerIdentity;
use crate::handlers;
use crate::state::Gate;
use crate::telemetry::spans;

/// A trigger connection: a caller submitting signed challenges.
pub struct TriggerConnection {
    stream: UnixStream,
    gate: Arc<Gate>,
}

impl TriggerConnection {
    pub fn new(stream: UnixStream, gate: Arc<Gate>) -> Self {
        Self { stream, gate }
    }

    /// Serve frames until the peer hangs up or sends an invalid frame.
    pub async fn run(self) -> anyhow::Result<()> {
        let Some(caller) = CallerIdentity::from_peer(&self.stream)? else {
            warn!("Trigger peer has no pid; closing");
            return Ok(());
        };
        let span = spans::trigger(&caller);
        let gate = self.gate;
        let pid = caller.pid;
        gate.peers.attach(pid);

        let result = serve_triggers(self.stream, &gate)
            .instrument(span.clone())
            .await;

        span.in_scope(|| {
            let last = gate.peers.detach(pid, || {
                let released = gate.handles.release_all(pid);
                gate.credentials.forget(pid);
                crate::metrics::set_handles_installed(gate.handles.total());
                debug!(released, "Last trigger connection of caller closed");
            });
            if !last {
                debug!(remaining = gate.peers.connections(pid), "Trigger peer disconnected");
            }
        });
        result
    }
}

async fn serve_triggers(stream: UnixStream, gate: &Gate) -> anyhow::Result<()> {
    let mut framed = Framed::new(stream, TriggerCodec::default());

    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(FrameError::FrameTooLong { actual, limit }) => {
                warn!(actual, limit, "Oversized trigger frame; closing");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let Some(caller) = CallerIdentity::from_peer(framed.get_ref())? else {
            return Ok(());
        };
        gate.credentials.observe(&caller);

        let reply = handlers::deliver(gate, caller, &frame).await;
        framed.send(reply).await?;
    }
    Ok(())
}

/// A control connection: an administrator issuing rule commands.
pub struct ControlConnection {
    stream: UnixStream,
    gate: Arc<Gate>,
}

impl ControlConnection {
    pub fn new(stream: UnixStream, gate: Arc<Gate>) -> Self {
        Self { stream, gate }
    }

    /// Answer command lines until the peer hangs up.
    pub async fn run(self) -> anyhow::Result<()> {
        let span = match CallerIdentity::from_peer(&self.stream)? {
            Some(caller) => spans::control(&caller),
            None => tracing::info_span!("control"),
        };
        serve_control(self.stream, &self.gate).instrument(span).await
    }
}

async fn serve_control(stream: UnixStream, gate: &Gate) -> anyhow::Result<()> {
    info!("Control client connected");
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    while let Some(line) = framed.next().await {
        let reply = match line {
            Ok(line) => handlers::handle_line(gate, &line),
            // The codec ends the stream after this; the client gets its answer first.
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                ControlReply::error(format!("line exceeds {MAX_LINE_LEN} bytes"))
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };
        for line in reply.to_lines() {
            framed.feed(line).await?;
        }
        SinkExt::<String>::flush(&mut framed).await?;
    }

    info!("Control client disconnected");
    Ok(())
}
