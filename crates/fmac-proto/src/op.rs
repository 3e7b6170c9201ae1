//! Operation and uid matchers for path authorization rules.
//!
//! Both matchers accept `*` as a wildcard. Operations are also accepted in
//! their numeric form (`0`..`3`, with `-1` as the wildcard).

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// File operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpType {
    /// Directory creation.
    Mkdir = 0,
    /// File open.
    Open = 1,
    /// Unlink.
    Unlink = 2,
    /// Rename.
    Rename = 3,
}

impl OpType {
    /// Every operation, in numeric order.
    pub const ALL: [OpType; 4] = [OpType::Mkdir, OpType::Open, OpType::Unlink, OpType::Rename];

    /// Protocol name of the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Mkdir => "mkdir",
            OpType::Open => "open",
            OpType::Unlink => "unlink",
            OpType::Rename => "rename",
        }
    }

    /// Look up an operation by its numeric code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OpType::Mkdir),
            1 => Some(OpType::Open),
            2 => Some(OpType::Unlink),
            3 => Some(OpType::Rename),
            _ => None,
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let by_name = OpType::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s));
        by_name
            .or_else(|| s.parse::<i64>().ok().and_then(OpType::from_code))
            .ok_or_else(|| ParseError::InvalidArgument {
                argument: "op",
                value: s.to_string(),
            })
    }
}

/// Operation selector of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpMatch {
    /// Matches every operation.
    #[default]
    Any,
    /// Matches one operation.
    Only(OpType),
}

impl OpMatch {
    /// Whether `op` is selected.
    pub fn matches(self, op: OpType) -> bool {
        match self {
            OpMatch::Any => true,
            OpMatch::Only(wanted) => wanted == op,
        }
    }
}

impl fmt::Display for OpMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpMatch::Any => f.write_str("*"),
            OpMatch::Only(op) => op.fmt(f),
        }
    }
}

impl FromStr for OpMatch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" | "-1" => Ok(OpMatch::Any),
            other => other.parse().map(OpMatch::Only),
        }
    }
}

/// Uid selector of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UidMatch {
    /// Matches every caller.
    Any,
    /// Matches one uid.
    Only(u32),
}

impl UidMatch {
    /// Whether `uid` is selected.
    pub fn matches(self, uid: u32) -> bool {
        match self {
            UidMatch::Any => true,
            UidMatch::Only(wanted) => wanted == uid,
        }
    }
}

impl fmt::Display for UidMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UidMatch::Any => f.write_str("*"),
            UidMatch::Only(uid) => write!(f, "{uid}"),
        }
    }
}

impl FromStr for UidMatch {
    type Err = ParseError;

    /// `*` and `0` both select every uid; rule tables have always used
    /// uid 0 as the wildcard.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(UidMatch::Any);
        }
        s.parse()
            .map(|uid| match uid {
                0 => UidMatch::Any,
                uid => UidMatch::Only(uid),
            })
            .map_err(|_| ParseError::InvalidArgument {
                argument: "uid",
                value: s.to_string(),
            })
    }
}
