//! Path authorization rule table.
//!
//! Readers never lock while matching: they clone the current snapshot
//! `Arc` (a read lock held for one pointer copy) and walk immutable data.
//! Writers are serialized, build a new snapshot from the old one
//! (structural sharing via `im`) and install it with a single swap. A
//! reader therefore sees the table either entirely before or entirely
//! after a write, and a rule it holds stays alive until it lets go.
//!
//! Lookup walks the queried path's ancestors longest first and scans each
//! prefix bucket in insertion order; the first matching rule decides.

use fmac_proto::command::MAX_PREFIX_LEN;
use fmac_proto::{OpMatch, OpType, ParseError, UidMatch};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::path::{ancestors, normalize};
use crate::error::RuleError;

/// One immutable authorization rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub path_prefix: String,
    pub uid: UidMatch,
    pub op: OpMatch,
    pub deny: bool,
}

impl Rule {
    /// Build a rule, normalizing and validating the prefix.
    pub fn new(prefix: &str, uid: UidMatch, op: OpMatch, deny: bool) -> Result<Self, RuleError> {
        if !prefix.starts_with('/') || prefix.len() > MAX_PREFIX_LEN {
            return Err(ParseError::InvalidArgument {
                argument: "path",
                value: prefix.to_string(),
            }
            .into());
        }
        Ok(Self {
            path_prefix: normalize(prefix).to_string(),
            uid,
            op,
            deny,
        })
    }

    /// Whether the prefix covers `path` (itself or anything beneath it).
    pub fn covers(&self, path: &str) -> bool {
        let prefix = self.path_prefix.as_str();
        prefix == "/"
            || path == prefix
            || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
    }

    pub fn matches(&self, path: &str, uid: u32, op: OpType) -> bool {
        self.uid.matches(uid) && self.op.matches(op) && self.covers(path)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path={} uid={} op={} deny={}",
            self.path_prefix,
            self.uid,
            self.op,
            u8::from(self.deny)
        )
    }
}

type Bucket = im::Vector<Arc<Rule>>;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    buckets: im::HashMap<String, Bucket>,
    len: usize,
}

/// Concurrent, read-mostly rule index.
#[derive(Debug)]
pub struct RuleTable {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    max_rules: usize,
    default_deny: bool,
}

impl RuleTable {
    pub fn new(max_rules: usize, default_deny: bool) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(()),
            max_rules,
            default_deny,
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Insert a rule. It becomes visible to readers in one step.
    pub fn add_rule(
        &self,
        prefix: &str,
        uid: UidMatch,
        deny: bool,
        op: OpMatch,
    ) -> Result<(), RuleError> {
        let rule = Arc::new(Rule::new(prefix, uid, op, deny)?);

        let _writer = self.writer.lock();
        let mut next = Snapshot::clone(&self.snapshot());
        if next.len >= self.max_rules {
            return Err(RuleError::TableFull(self.max_rules));
        }
        let mut bucket = next
            .buckets
            .get(&rule.path_prefix)
            .cloned()
            .unwrap_or_default();
        bucket.push_back(Arc::clone(&rule));
        next.buckets.insert(rule.path_prefix.clone(), bucket);
        next.len += 1;
        *self.current.write() = Arc::new(next);

        debug!(rule = %rule, "rule added");
        Ok(())
    }

    /// Remove every rule with exactly this prefix and selectors.
    pub fn remove_rule(
        &self,
        prefix: &str,
        uid: UidMatch,
        op: OpMatch,
    ) -> Result<usize, RuleError> {
        let key = normalize(prefix);

        let _writer = self.writer.lock();
        let mut next = Snapshot::clone(&self.snapshot());
        let Some(bucket) = next.buckets.get(key) else {
            return Err(RuleError::NotFound(key.to_string()));
        };
        let kept: Bucket = bucket
            .iter()
            .filter(|r| !(r.uid == uid && r.op == op))
            .cloned()
            .collect();
        let removed = bucket.len() - kept.len();
        if removed == 0 {
            return Err(RuleError::NotFound(key.to_string()));
        }
        if kept.is_empty() {
            next.buckets.remove(key);
        } else {
            next.buckets.insert(key.to_string(), kept);
        }
        next.len -= removed;
        *self.current.write() = Arc::new(next);

        debug!(prefix = key, removed, "rules removed");
        Ok(removed)
    }

    /// Remove all rules. Returns how many there were.
    pub fn flush(&self) -> usize {
        let _writer = self.writer.lock();
        let old = std::mem::replace(&mut *self.current.write(), Arc::new(Snapshot::default()));
        debug!(removed = old.len, "rule table flushed");
        old.len
    }

    /// First rule matching the query, if any.
    pub fn lookup(&self, path: &str, uid: u32, op: OpType) -> Option<Arc<Rule>> {
        let snapshot = self.snapshot();
        let path = normalize(path);
        // No rule prefix is longer than MAX_PREFIX_LEN.
        ancestors(path)
            .skip_while(|prefix| prefix.len() > MAX_PREFIX_LEN)
            .find_map(|prefix| {
                snapshot
                    .buckets
                    .get(prefix)?
                    .iter()
                    .find(|rule| rule.matches(path, uid, op))
                    .cloned()
            })
    }

    /// Whether the operation is denied.
    pub fn authorize(&self, path: &str, uid: u32, op: OpType) -> bool {
        self.lookup(path, uid, op)
            .map(|rule| rule.deny)
            .unwrap_or(self.default_deny)
    }

    /// Rules as human-readable lines, grouped by prefix.
    pub fn list(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut prefixes: Vec<&String> = snapshot.buckets.keys().collect();
        prefixes.sort();
        prefixes
            .into_iter()
            .filter_map(|p| snapshot.buckets.get(p))
            .flat_map(|bucket| bucket.iter().map(|rule| rule.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len
    }
}
