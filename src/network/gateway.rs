//! Gateway - Unix socket listeners that accept incoming connections.
//!
//! The Gateway binds the trigger and control sockets and spawns a
//! connection task for each peer. Socket files are created with the
//! configured permission bits and removed again on shutdown.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{error, info, instrument, warn};

use crate::config::ListenConfig;
use crate::network::{ControlConnection, TriggerConnection};
use crate::state::Gate;

/// The Gateway accepts trigger and control connections and spawns handlers.
pub struct Gateway {
    trigger_listener: UnixListener,
    control_listener: UnixListener,
    paths: [PathBuf; 2],
    gate: Arc<Gate>,
}

impl Gateway {
    /// Bind both sockets.
    pub fn bind(config: &ListenConfig, gate: Arc<Gate>) -> anyhow::Result<Self> {
        let trigger_listener = bind_socket(&config.trigger_socket, config.trigger_mode)?;
        info!(path = %config.trigger_socket.display(), "Trigger listener bound");

        let control_listener = bind_socket(&config.control_socket, config.control_mode)?;
        info!(path = %config.control_socket.display(), "Control listener bound");

        Ok(Self {
            trigger_listener,
            control_listener,
            paths: [config.trigger_socket.clone(), config.control_socket.clone()],
            gate,
        })
    }

    /// Accept connections until `shutdown` resolves, then remove the
    /// socket files.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let control = tokio::spawn(accept_control(
            self.control_listener,
            Arc::clone(&self.gate),
        ));

        tokio::select! {
            () = accept_triggers(self.trigger_listener, Arc::clone(&self.gate)) => {}
            () = shutdown => info!("Shutdown requested"),
        }

        control.abort();
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove socket file");
            }
        }
        Ok(())
    }
}

/// Bind a listener at `path`, replacing a stale socket left by a previous run.
///
/// The socket is bound inside a fresh 0700 directory next to `path`, given
/// its mode there and only then renamed into place, so it is never
/// reachable with umask-default permissions.
fn bind_socket(path: &Path, mode: u32) -> anyhow::Result<UnixListener> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("socket path {} has no file name", path.display()))?;

    let staging = tempfile::Builder::new().prefix(".fmacd-").tempdir_in(parent)?;
    let staged = staging.path().join(name);
    let listener = UnixListener::bind(&staged)?;
    std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(mode))?;

    match std::fs::remove_file(path) {
        Ok(()) => warn!(path = %path.display(), "Removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::rename(&staged, path)?;
    Ok(listener)
}

async fn accept_triggers(listener: UnixListener, gate: Arc<Gate>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    if let Err(e) = TriggerConnection::new(stream, gate).run().await {
                        warn!(error = %e, "Trigger connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept trigger connection");
            }
        }
    }
}

async fn accept_control(listener: UnixListener, gate: Arc<Gate>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    if let Err(e) = ControlConnection::new(stream, gate).run().await {
                        warn!(error = %e, "Control connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept control connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn socket_appears_with_configured_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.sock");
        std::fs::write(&path, b"stale").unwrap();

        let _listener = bind_socket(&path, 0o600).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "staging directory left behind");

        tokio::net::UnixStream::connect(&path).await.unwrap();
    }
}
