//! # fmac-proto
//!
//! Wire formats shared by `fmacd` and the programs that talk to it.
//!
//! ## Features
//!
//! - Lenient base32 decoding of human-transcribed secrets
//! - Time-based one-time codes (HMAC-SHA1, 30 second steps, 6 digits)
//! - Operation and uid matchers used by path authorization rules
//! - The line-oriented rule control protocol (commands and replies)
//! - Length-prefixed trigger frames carrying signed challenges
//!
//! ## Quick Start
//!
//! ```rust
//! use fmac_proto::{ControlCommand, OpMatch, UidMatch};
//!
//! let cmd: ControlCommand = "add /data 1000 1 open".parse().expect("valid command");
//! match cmd {
//!     ControlCommand::Add { prefix, uid, deny, op } => {
//!         assert_eq!(prefix, "/data");
//!         assert_eq!(uid, UidMatch::Only(1000));
//!         assert!(deny);
//!         assert!(matches!(op, OpMatch::Only(_)));
//!     }
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ```rust
//! use fmac_proto::totp::{challenge_message, TotpGenerator};
//!
//! let totp = TotpGenerator::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");
//! assert_eq!(totp.generate(59), 287082);
//! assert_eq!(challenge_message(5924), "5924");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod base32;
pub mod command;
pub mod error;
pub mod op;
pub mod reply;
pub mod totp;
pub mod trigger;

pub use self::command::ControlCommand;
pub use self::error::{FrameError, ParseError};
pub use self::op::{OpMatch, OpType, UidMatch};
pub use self::reply::{ControlReply, ReplyLine};
pub use self::totp::TotpGenerator;
pub use self::trigger::{CapabilityGrant, TriggerReply, MAX_FRAME_LEN};
#[cfg(feature = "tokio")]
pub use self::trigger::{TriggerClientCodec, TriggerCodec};
