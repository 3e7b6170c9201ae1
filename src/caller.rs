//! Identity of the process on the other end of a trigger connection.

use std::fmt;
use tokio::net::UnixStream;

/// Caller identity, read from the socket peer credentials for every
/// request and never cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerIdentity {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl CallerIdentity {
    /// Read the peer credentials of `stream`.
    ///
    /// Returns `None` when the platform does not report a pid.
    pub fn from_peer(stream: &UnixStream) -> std::io::Result<Option<Self>> {
        let cred = stream.peer_cred()?;
        Ok(cred
            .pid()
            .and_then(|pid| u32::try_from(pid).ok())
            .map(|pid| Self {
                uid: cred.uid(),
                gid: cred.gid(),
                pid,
            }))
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} (uid {})", self.pid, self.uid)
    }
}
