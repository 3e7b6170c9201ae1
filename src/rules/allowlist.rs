//! Uids permitted to attempt admission.

use parking_lot::RwLock;

/// Bounded uid allowlist. An empty list admits every caller.
#[derive(Debug)]
pub struct UidAllowlist {
    uids: RwLock<Vec<u32>>,
    max: usize,
}

impl UidAllowlist {
    pub fn new(max: usize, initial: &[u32]) -> Self {
        let list = Self {
            uids: RwLock::new(Vec::new()),
            max,
        };
        list.extend(initial.iter().copied());
        list
    }

    /// Append uids, skipping duplicates. Stops silently at capacity.
    /// Returns how many were added.
    pub fn extend(&self, uids: impl IntoIterator<Item = u32>) -> usize {
        let mut list = self.uids.write();
        let before = list.len();
        for uid in uids {
            if list.len() >= self.max {
                break;
            }
            if !list.contains(&uid) {
                list.push(uid);
            }
        }
        list.len() - before
    }

    /// Whether `uid` may attempt admission.
    pub fn permits(&self, uid: u32) -> bool {
        let list = self.uids.read();
        list.is_empty() || list.contains(&uid)
    }

    pub fn to_csv(&self) -> String {
        self.uids
            .read()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.uids.read().len()
    }
}
