/// Datagram level encoding and decoding of requests and replies
use std::io::{self, Write};

use crate::{
    error::ParseError,
    protocol::{Command, MAX_TOKENS, QUIT, Reply},
};

/// A tokenized request as received in a single datagram.
///
/// Every request owns a fresh token list; nothing is shared between datagrams.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    tokens: Vec<String>,
}

impl Request {
    /// Split a datagram payload on spaces.
    ///
    /// Surrounding whitespace (such as the newline appended by `nc`) is ignored and
    /// consecutive spaces count as one separator.
    pub fn from_datagram(payload: &[u8]) -> Result<Request, ParseError> {
        let text = str::from_utf8(payload)?.trim_ascii();
        let tokens: Vec<String> = text
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        if tokens.len() > MAX_TOKENS {
            return Err(ParseError::TooManyTokens {
                max: MAX_TOKENS,
                got: tokens.len(),
            });
        }
        Ok(Request { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn to_command(&self) -> Result<Command, ParseError> {
        Command::from_tokens(&self.tokens)
    }
}

/// Whether the payload asks the daemon to terminate
pub fn is_quit(payload: &[u8]) -> bool {
    payload.starts_with(QUIT)
}

impl Command {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl Reply {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "{}", self)
    }

    pub fn from_datagram(payload: &[u8]) -> Result<Reply, ParseError> {
        let text = str::from_utf8(payload)?.trim_ascii();
        match text {
            "error" => Ok(Reply::Error),
            "ok" => Ok(Reply::Ok(None)),
            _ => match text.strip_prefix("ok ") {
                Some(value) if !value.is_empty() => Ok(Reply::Ok(Some(value.to_string()))),
                _ => Err(ParseError::InvalidFormat(format!(
                    "Invalid reply '{}'",
                    text
                ))),
            },
        }
    }
}
