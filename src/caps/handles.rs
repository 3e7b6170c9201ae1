//! Per-caller handle namespace for issued capability regions.
//!
//! A region is an anonymous, unlinked, fixed-size file. Installing it
//! gives it a handle number in the caller's namespace; the region lives
//! until the handle is revoked or the caller's namespace is released.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::File;
use tracing::debug;

use crate::error::IssueError;

/// First handle number handed out (0-2 are the standard streams).
pub const FIRST_HANDLE: i32 = 3;

/// An allocated, memory-mappable region.
#[derive(Debug)]
pub struct CapabilityRegion {
    #[allow(dead_code)] // held open for as long as the handle is installed
    file: File,
    size: u64,
}

impl CapabilityRegion {
    /// Allocate an anonymous region of `size` bytes.
    pub fn allocate(size: u64) -> Result<Self, IssueError> {
        let file = tempfile::tempfile().map_err(IssueError::AllocationFailure)?;
        file.set_len(size).map_err(IssueError::AllocationFailure)?;
        Ok(Self { file, size })
    }

    /// [`allocate`](Self::allocate) on the blocking pool.
    pub async fn allocate_off_thread(size: u64) -> Result<Self, IssueError> {
        tokio::task::spawn_blocking(move || Self::allocate(size))
            .await
            .map_err(|e| IssueError::AllocationFailure(std::io::Error::other(e)))?
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    #[cfg(test)]
    pub fn file(&self) -> &File {
        &self.file
    }
}

#[derive(Debug)]
struct Namespace {
    next: i32,
    open: BTreeMap<i32, CapabilityRegion>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            next: FIRST_HANDLE,
            open: BTreeMap::new(),
        }
    }
}

/// Handle tables of all callers, keyed by pid.
#[derive(Debug)]
pub struct HandleTable {
    namespaces: DashMap<u32, Namespace>,
    max_per_caller: usize,
}

impl HandleTable {
    pub fn new(max_per_caller: usize) -> Self {
        Self {
            namespaces: DashMap::new(),
            max_per_caller,
        }
    }

    /// Install `region` for `pid`. On failure the region is dropped, which
    /// releases it.
    pub fn install(&self, pid: u32, region: CapabilityRegion) -> Result<i32, IssueError> {
        let mut ns = self.namespaces.entry(pid).or_default();
        if ns.open.len() >= self.max_per_caller {
            return Err(IssueError::HandleInstallFailure {
                pid,
                reason: "per-caller handle limit reached",
            });
        }
        let handle = ns.next;
        ns.next = handle
            .checked_add(1)
            .ok_or(IssueError::HandleInstallFailure {
                pid,
                reason: "handle numbers exhausted",
            })?;
        debug!(pid, handle, size = region.size(), "handle installed");
        ns.open.insert(handle, region);
        Ok(handle)
    }

    /// Revoke one handle. Returns whether it existed.
    pub fn revoke(&self, pid: u32, handle: i32) -> bool {
        self.namespaces
            .get_mut(&pid)
            .is_some_and(|mut ns| ns.open.remove(&handle).is_some())
    }

    /// Release every handle of `pid`. Returns how many were open.
    pub fn release_all(&self, pid: u32) -> usize {
        let released = self
            .namespaces
            .remove(&pid)
            .map(|(_, ns)| ns.open.len())
            .unwrap_or(0);
        if released > 0 {
            debug!(pid, released, "released capability handles");
        }
        released
    }

    pub fn count(&self, pid: u32) -> usize {
        self.namespaces.get(&pid).map(|ns| ns.open.len()).unwrap_or(0)
    }

    /// Size of the region behind `handle`, if installed.
    #[cfg(test)]
    pub fn region_size(&self, pid: u32, handle: i32) -> Option<u64> {
        self.namespaces
            .get(&pid)
            .and_then(|ns| ns.open.get(&handle).map(CapabilityRegion::size))
    }

    /// Open handles across all callers.
    pub fn total(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.open.len()).sum()
    }
}
