//! Live trigger connections per caller process.
//!
//! Privilege records and capability handles are keyed by pid, and one
//! process may hold several trigger connections. Per-pid state is torn
//! down only when the last of them closes.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct PeerRegistry {
    live: DashMap<u32, usize>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new connection from `pid`.
    pub fn attach(&self, pid: u32) {
        *self.live.entry(pid).or_insert(0) += 1;
    }

    /// Drop one connection from `pid`. When it was the last one, runs
    /// `teardown` while the entry is still locked, so a concurrent
    /// `attach` for the same pid waits until teardown is done.
    pub fn detach(&self, pid: u32, teardown: impl FnOnce()) -> bool {
        match self.live.entry(pid) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() -= 1;
                if *entry.get() > 0 {
                    return false;
                }
                teardown();
                entry.remove();
                true
            }
            Entry::Vacant(_) => {
                teardown();
                true
            }
        }
    }

    /// Open connections from `pid`.
    pub fn connections(&self, pid: u32) -> usize {
        self.live.get(&pid).map(|n| *n).unwrap_or(0)
    }
}
