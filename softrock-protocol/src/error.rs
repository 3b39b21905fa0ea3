use std::{error::Error, fmt::Display, io, str::Utf8Error};

/// Errors that may occur when turning a datagram or token list into a command or reply.
#[derive(Debug)]
pub enum ParseError {
    IoError(io::Error),
    Empty,
    TooManyTokens { max: usize, got: usize },
    UnknownVerb(String),
    UnknownNoun { verb: &'static str, noun: String },
    MissingArgument(&'static str),
    InvalidNumber(String),
    InvalidFormat(String),
}

impl From<io::Error> for ParseError {
    fn from(value: io::Error) -> Self {
        ParseError::IoError(value)
    }
}

impl From<Utf8Error> for ParseError {
    fn from(value: Utf8Error) -> Self {
        ParseError::InvalidFormat(format!("Invalid UTF8: {}", value))
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IoError(error) => write!(f, "{}", error),
            ParseError::Empty => write!(f, "Received empty request"),
            ParseError::TooManyTokens { max, got } => {
                write!(f, "Too many tokens! Maximum is {}, but got {}", max, got)
            }
            ParseError::UnknownVerb(verb) => write!(f, "Unknown command {}", verb),
            ParseError::UnknownNoun { verb, noun } => {
                write!(f, "Unknown argument {} for {}", noun, verb)
            }
            ParseError::MissingArgument(noun) => write!(f, "Missing value for {}", noun),
            ParseError::InvalidNumber(token) => write!(f, "Invalid number {}", token),
            ParseError::InvalidFormat(format) => write!(f, "{}", format),
        }
    }
}

impl Error for ParseError {}
