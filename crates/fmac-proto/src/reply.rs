//! Control protocol replies.
//!
//! A reply is zero or more data lines prefixed with `- `, terminated by a
//! single status line: `OK` or `ERR <message>`.

/// Prefix of every data line.
pub const DATA_PREFIX: &str = "- ";

/// Status line for success.
pub const STATUS_OK: &str = "OK";

/// Prefix of the status line for failure.
pub const STATUS_ERR: &str = "ERR ";

/// A complete reply to one control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// Success, with optional data lines.
    Ok(Vec<String>),
    /// Failure, with a human-readable reason.
    Err(String),
}

impl ControlReply {
    /// Success without data.
    pub fn ok() -> Self {
        ControlReply::Ok(Vec::new())
    }

    /// Success with data lines.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ControlReply::Ok(lines.into_iter().map(Into::into).collect())
    }

    /// Failure.
    pub fn error(reason: impl std::fmt::Display) -> Self {
        ControlReply::Err(reason.to_string())
    }

    /// Render as wire lines, without line terminators.
    ///
    /// Embedded newlines in data or error text are replaced by spaces so a
    /// reply can never smuggle an extra status line.
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            ControlReply::Ok(data) => data
                .iter()
                .map(|line| format!("{DATA_PREFIX}{}", single_line(line)))
                .chain(std::iter::once(STATUS_OK.to_string()))
                .collect(),
            ControlReply::Err(reason) => vec![format!("{STATUS_ERR}{}", single_line(reason))],
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// One classified reply line, as seen by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLine<'a> {
    /// A data line (prefix removed).
    Data(&'a str),
    /// Terminal success.
    Ok,
    /// Terminal failure with reason.
    Err(&'a str),
}

impl<'a> ReplyLine<'a> {
    /// Classify a received line. Returns `None` for lines that fit no form.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(data) = line.strip_prefix(DATA_PREFIX) {
            Some(ReplyLine::Data(data))
        } else if line == STATUS_OK {
            Some(ReplyLine::Ok)
        } else {
            line.strip_prefix(STATUS_ERR).map(ReplyLine::Err)
        }
    }

    /// Whether this line ends a reply.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReplyLine::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_with_data() {
        let reply = ControlReply::lines(["a", "b"]);
        assert_eq!(reply.to_lines(), vec!["- a", "- b", "OK"]);
    }

    #[test]
    fn errors_are_single_line() {
        let reply = ControlReply::error("bad\nOK");
        assert_eq!(reply.to_lines(), vec!["ERR bad OK"]);
    }

    #[test]
    fn classify_lines() {
        assert_eq!(ReplyLine::parse("- deny\r\n"), Some(ReplyLine::Data("deny")));
        assert_eq!(ReplyLine::parse("OK"), Some(ReplyLine::Ok));
        assert_eq!(ReplyLine::parse("ERR nope"), Some(ReplyLine::Err("nope")));
        assert_eq!(ReplyLine::parse("garbage"), None);
        assert!(ReplyLine::Ok.is_terminal());
        assert!(!ReplyLine::Data("x").is_terminal());
    }
}
