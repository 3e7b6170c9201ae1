//! Rule control protocol commands.
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! add <path> <uid|*> <0|1> [op]     insert a rule (deny = 1)
//! del <path> <uid|*> [op]           remove matching rules
//! flush                             remove every rule
//! disable | enable                  bypass / restore authorization
//! printk_on | printk_off            log denials to the diagnostic log
//! list                              dump rules
//! uids                              dump the uid allowlist
//! allow <uid,uid,...>               extend the uid allowlist
//! check <path> <uid> <op>           query an authorization decision
//! log                               dump the diagnostic log
//! creds <pid>                       dump a caller's privilege record
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::take_while1, character::complete::multispace0, sequence::preceded, IResult,
};
use smallvec::SmallVec;

use crate::error::{ParseError, Result};
use crate::op::{OpMatch, OpType, UidMatch};

/// Longest accepted rule path prefix, in bytes.
pub const MAX_PREFIX_LEN: usize = 255;

/// Longest accepted control line, in bytes.
pub const MAX_LINE_LEN: usize = 512;

/// A parsed control-plane command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Insert a rule.
    Add {
        /// Absolute path prefix the rule covers.
        prefix: String,
        /// Caller selector.
        uid: UidMatch,
        /// Deny (`true`) or explicitly allow (`false`).
        deny: bool,
        /// Operation selector; wildcard when omitted.
        op: OpMatch,
    },
    /// Remove every rule with exactly this prefix and selectors.
    Del {
        /// Rule prefix.
        prefix: String,
        /// Caller selector.
        uid: UidMatch,
        /// Operation selector.
        op: OpMatch,
    },
    /// Remove all rules.
    Flush,
    /// Bypass authorization checks.
    Disable,
    /// Restore authorization checks.
    Enable,
    /// Log every denial to the diagnostic log.
    PrintkOn,
    /// Stop logging denials.
    PrintkOff,
    /// Dump the rule table.
    List,
    /// Dump the uid allowlist.
    Uids,
    /// Extend the uid allowlist.
    Allow(Vec<u32>),
    /// Ask for an authorization decision.
    Check {
        /// Path being accessed.
        path: String,
        /// Calling uid.
        uid: u32,
        /// Operation.
        op: OpType,
    },
    /// Dump the diagnostic log.
    Log,
    /// Dump the privilege record of a caller.
    Creds {
        /// Caller process id.
        pid: u32,
    },
}

impl ControlCommand {
    /// Protocol keyword of the command.
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Add { .. } => "add",
            ControlCommand::Del { .. } => "del",
            ControlCommand::Flush => "flush",
            ControlCommand::Disable => "disable",
            ControlCommand::Enable => "enable",
            ControlCommand::PrintkOn => "printk_on",
            ControlCommand::PrintkOff => "printk_off",
            ControlCommand::List => "list",
            ControlCommand::Uids => "uids",
            ControlCommand::Allow(_) => "allow",
            ControlCommand::Check { .. } => "check",
            ControlCommand::Log => "log",
            ControlCommand::Creds { .. } => "creds",
        }
    }

    /// Whether the command changes daemon state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ControlCommand::Add { .. }
                | ControlCommand::Del { .. }
                | ControlCommand::Flush
                | ControlCommand::Disable
                | ControlCommand::Enable
                | ControlCommand::PrintkOn
                | ControlCommand::PrintkOff
                | ControlCommand::Allow(_)
        )
    }
}

/// Parse the next whitespace-delimited token.
fn next_token(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace0,
        take_while1(|c: char| !c.is_ascii_whitespace()),
    )(input)
}

fn tokenize(line: &str) -> SmallVec<[&str; 6]> {
    let mut tokens = SmallVec::new();
    let mut rest = line;
    while let Ok((after, token)) = next_token(rest) {
        tokens.push(token);
        rest = after;
    }
    tokens
}

/// Cursor over the arguments of one command.
/// Leading word of a command line. Commands without arguments are
/// complete as soon as the word is known.
enum Keyword {
    Add,
    Del,
    Allow,
    Check,
    Creds,
    Bare(ControlCommand),
}

impl Keyword {
    fn name(&self) -> &'static str {
        match self {
            Keyword::Add => "add",
            Keyword::Del => "del",
            Keyword::Allow => "allow",
            Keyword::Check => "check",
            Keyword::Creds => "creds",
            Keyword::Bare(command) => command.name(),
        }
    }
}

struct Args<'a> {
    command: &'static str,
    tokens: smallvec::IntoIter<[&'a str; 6]>,
}

impl<'a> Args<'a> {
    fn required(&mut self, argument: &'static str) -> Result<&'a str> {
        self.tokens.next().ok_or(ParseError::MissingArgument {
            command: self.command,
            argument,
        })
    }

    fn optional(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(rest) => Err(ParseError::TrailingInput {
                command: self.command,
                rest: rest.to_string(),
            }),
        }
    }
}

fn parse_prefix(token: &str) -> Result<String> {
    if !token.starts_with('/') || token.len() > MAX_PREFIX_LEN {
        return Err(ParseError::InvalidArgument {
            argument: "path",
            value: token.to_string(),
        });
    }
    Ok(token.to_string())
}

fn parse_deny(token: &str) -> Result<bool> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(ParseError::InvalidArgument {
            argument: "deny",
            value: other.to_string(),
        }),
    }
}

fn parse_number(argument: &'static str, token: &str) -> Result<u32> {
    token.parse().map_err(|_| ParseError::InvalidArgument {
        argument,
        value: token.to_string(),
    })
}

/// Parse a comma separated uid list, silently skipping entries that are
/// not unsigned integers.
pub fn parse_uid_list(csv: &str) -> Vec<u32> {
    csv.split(',')
        .filter_map(|entry| entry.trim().parse().ok())
        .collect()
}

impl FromStr for ControlCommand {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self> {
        let tokens = tokenize(line.trim_end_matches(['\r', '\n']));
        let mut tokens = tokens.into_iter();
        let word = tokens.next().ok_or(ParseError::Empty)?;

        let keyword = match word.to_ascii_lowercase().as_str() {
            "add" => Keyword::Add,
            "del" => Keyword::Del,
            "allow" => Keyword::Allow,
            "check" => Keyword::Check,
            "creds" => Keyword::Creds,
            "flush" => Keyword::Bare(ControlCommand::Flush),
            "disable" => Keyword::Bare(ControlCommand::Disable),
            "enable" => Keyword::Bare(ControlCommand::Enable),
            "printk_on" => Keyword::Bare(ControlCommand::PrintkOn),
            "printk_off" => Keyword::Bare(ControlCommand::PrintkOff),
            "list" => Keyword::Bare(ControlCommand::List),
            "uids" => Keyword::Bare(ControlCommand::Uids),
            "log" => Keyword::Bare(ControlCommand::Log),
            _ => return Err(ParseError::UnknownCommand(word.to_string())),
        };
        let mut args = Args {
            command: keyword.name(),
            tokens,
        };

        let command = match keyword {
            Keyword::Add => {
                let prefix = parse_prefix(args.required("path")?)?;
                let uid: UidMatch = args.required("uid")?.parse()?;
                let deny = parse_deny(args.required("deny")?)?;
                let op = args.optional().map(str::parse::<OpMatch>).transpose()?.unwrap_or_default();
                ControlCommand::Add {
                    prefix,
                    uid,
                    deny,
                    op,
                }
            }
            Keyword::Del => {
                let prefix = parse_prefix(args.required("path")?)?;
                let uid: UidMatch = args.required("uid")?.parse()?;
                let op = args.optional().map(str::parse::<OpMatch>).transpose()?.unwrap_or_default();
                ControlCommand::Del { prefix, uid, op }
            }
            Keyword::Allow => {
                let mut uids = parse_uid_list(args.required("uid list")?);
                while let Some(more) = args.optional() {
                    uids.extend(parse_uid_list(more));
                }
                ControlCommand::Allow(uids)
            }
            Keyword::Check => {
                let path = args.required("path")?.to_string();
                let uid = parse_number("uid", args.required("uid")?)?;
                let op: OpType = args.required("op")?.parse()?;
                ControlCommand::Check { path, uid, op }
            }
            Keyword::Creds => ControlCommand::Creds {
                pid: parse_number("pid", args.required("pid")?)?,
            },
            Keyword::Bare(command) => command,
        };

        args.finish()?;
        Ok(command)
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Add {
                prefix,
                uid,
                deny,
                op,
            } => write!(f, "add {} {} {} {}", prefix, uid, u8::from(*deny), op),
            ControlCommand::Del { prefix, uid, op } => write!(f, "del {} {} {}", prefix, uid, op),
            ControlCommand::Allow(uids) => {
                f.write_str("allow ")?;
                for (i, uid) in uids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{uid}")?;
                }
                Ok(())
            }
            ControlCommand::Check { path, uid, op } => write!(f, "check {} {} {}", path, uid, op),
            ControlCommand::Creds { pid } => write!(f, "creds {pid}"),
            other => f.write_str(other.name()),
        }
    }
}
