//! Error types for the fmac wire formats.
//!
//! [`ParseError`] covers malformed control-plane commands (including rule
//! definitions); [`FrameError`] covers the binary trigger framing.

use thiserror::Error;

/// Convenience type alias for command parsing results.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// A control-plane line that could not be turned into a command.
///
/// Every variant carries enough text to be sent back verbatim to the
/// administrator in an `ERR` reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line contained no command word.
    #[error("empty command")]
    Empty,

    /// The command word is not part of the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument was not supplied.
    #[error("{command}: missing {argument}")]
    MissingArgument {
        /// Command being parsed.
        command: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// An argument was present but could not be interpreted.
    #[error("invalid {argument}: {value:?}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// The raw token.
        value: String,
    },

    /// Extra tokens followed a complete command.
    #[error("{command}: unexpected trailing input {rest:?}")]
    TrailingInput {
        /// Command being parsed.
        command: &'static str,
        /// First unexpected token.
        rest: String,
    },
}

/// Errors raised by the trigger frame codecs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared frame length exceeds the codec limit.
    #[error("frame too long: {actual} bytes (limit: {limit})")]
    FrameTooLong {
        /// Declared length.
        actual: usize,
        /// Maximum accepted length.
        limit: usize,
    },

    /// Reply started with a tag byte this version does not know.
    #[error("unknown reply tag: {0:#04x}")]
    UnknownReplyTag(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_messages_are_descriptive() {
        let err = ParseError::InvalidArgument {
            argument: "deny",
            value: "2".into(),
        };
        assert_eq!(err.to_string(), "invalid deny: \"2\"");

        let err = ParseError::MissingArgument {
            command: "add",
            argument: "uid",
        };
        assert_eq!(err.to_string(), "add: missing uid");
    }

    #[test]
    fn frame_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: FrameError = io.into();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
