use std::fmt::Display;

use crate::error::ParseError;

/// Maximum number of space separated tokens in a request: verb, noun and value.
pub const MAX_TOKENS: usize = 3;

/// Payload prefix that stops a daemon.
pub const QUIT: &[u8] = b"quit";

/// Values that can be read with a `get` command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// Push-to-talk state, either cached or read from the firmware.
    Ptt,
    /// Paddle state. 0: none, 1: dit, 2: dah, 3: both.
    Keys,
    /// Current frequency in user units.
    Frequency,
    /// Cached CW tone in Hz.
    Tone,
    /// LO multiply factor stored in the device (band 0).
    Si570Multiplier,
    /// Process local multiplier between user and device frequencies.
    LocalMultiplier,
}

/// A command of the shared vocabulary that both the daemon and the command line understand.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    Get(Query),
    SetPtt(bool),
    SetBpf(bool),
    /// Frequency in user units (MHz before the multiplier is applied).
    SetFrequency(f64),
    SetTone(i32),
    SetLocalMultiplier(f64),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SetNoun {
    Ptt,
    Bpf,
    Frequency,
    Tone,
    LocalMultiplier,
}

const GET_NOUNS: &[(&str, Query)] = &[
    ("ptt", Query::Ptt),
    ("keys", Query::Keys),
    ("freq", Query::Frequency),
    ("tone", Query::Tone),
    ("si570_multiplier", Query::Si570Multiplier),
    ("local_multiplier", Query::LocalMultiplier),
];

// Older clients address these by their first letter only ("get p", "get frequency").
const GET_ALIASES: &[(char, Query)] = &[
    ('p', Query::Ptt),
    ('k', Query::Keys),
    ('f', Query::Frequency),
    ('t', Query::Tone),
];

const SET_NOUNS: &[(&str, SetNoun)] = &[
    ("ptt", SetNoun::Ptt),
    ("bpf", SetNoun::Bpf),
    ("freq", SetNoun::Frequency),
    ("tone", SetNoun::Tone),
    ("local_multiplier", SetNoun::LocalMultiplier),
];

impl Query {
    fn resolve(noun: &str) -> Option<Query> {
        GET_NOUNS
            .iter()
            .find(|(name, _)| *name == noun)
            .map(|(_, query)| *query)
            .or_else(|| {
                let first = noun.chars().next()?;
                GET_ALIASES
                    .iter()
                    .find(|(c, _)| *c == first)
                    .map(|(_, query)| *query)
            })
    }

    /// Canonical token of this query on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Query::Ptt => "ptt",
            Query::Keys => "keys",
            Query::Frequency => "freq",
            Query::Tone => "tone",
            Query::Si570Multiplier => "si570_multiplier",
            Query::LocalMultiplier => "local_multiplier",
        }
    }
}

/// Switch arguments are "on" if they start with `on`, anything else is off.
pub fn parse_switch(token: &str) -> bool {
    token.starts_with("on")
}

/// Parse a numeric argument. Garbage is an error, never zero.
pub fn parse_number(token: &str) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(token.to_string()))
}

impl Command {
    /// Resolve a token list into a command.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Command, ParseError> {
        if tokens.len() > MAX_TOKENS {
            return Err(ParseError::TooManyTokens {
                max: MAX_TOKENS,
                got: tokens.len(),
            });
        }
        let mut tokens = tokens.iter().map(S::as_ref);
        let verb = tokens.next().ok_or(ParseError::Empty)?;
        match verb {
            "get" => {
                let noun = tokens.next().ok_or(ParseError::MissingArgument("get"))?;
                let query = Query::resolve(noun).ok_or_else(|| ParseError::UnknownNoun {
                    verb: "get",
                    noun: noun.to_string(),
                })?;
                Ok(Command::Get(query))
            }
            "set" => {
                let noun = tokens.next().ok_or(ParseError::MissingArgument("set"))?;
                let (name, target) = SET_NOUNS
                    .iter()
                    .find(|(name, _)| *name == noun)
                    .ok_or_else(|| ParseError::UnknownNoun {
                        verb: "set",
                        noun: noun.to_string(),
                    })?;
                let value = tokens.next().ok_or(ParseError::MissingArgument(*name))?;
                Ok(match target {
                    SetNoun::Ptt => Command::SetPtt(parse_switch(value)),
                    SetNoun::Bpf => Command::SetBpf(parse_switch(value)),
                    SetNoun::Frequency => Command::SetFrequency(parse_number(value)?),
                    SetNoun::Tone => Command::SetTone(parse_number(value)? as i32),
                    SetNoun::LocalMultiplier => {
                        Command::SetLocalMultiplier(parse_number(value)?)
                    }
                })
            }
            other => Err(ParseError::UnknownVerb(other.to_string())),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let switch = |on: bool| if on { "on" } else { "off" };
        match self {
            Command::Get(query) => write!(f, "get {}", query.name()),
            Command::SetPtt(on) => write!(f, "set ptt {}", switch(*on)),
            Command::SetBpf(on) => write!(f, "set bpf {}", switch(*on)),
            Command::SetFrequency(freq) => write!(f, "set freq {:.6}", freq),
            Command::SetTone(tone) => write!(f, "set tone {}", tone),
            Command::SetLocalMultiplier(m) => write!(f, "set local_multiplier {:.6}", m),
        }
    }
}

/// The reply to a request: `ok`, `ok <value>` or `error`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    Ok(Option<String>),
    Error,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Ok(None)
    }

    pub fn value(value: impl Display) -> Reply {
        Reply::Ok(Some(value.to_string()))
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Ok(None) => write!(f, "ok"),
            Reply::Ok(Some(value)) => write!(f, "ok {}", value),
            Reply::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(line: &str) -> Result<Command, ParseError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        Command::from_tokens(&tokens)
    }

    #[test]
    fn get_queries_by_full_name() {
        assert_eq!(parse("get ptt").unwrap(), Command::Get(Query::Ptt));
        assert_eq!(parse("get keys").unwrap(), Command::Get(Query::Keys));
        assert_eq!(parse("get freq").unwrap(), Command::Get(Query::Frequency));
        assert_eq!(parse("get tone").unwrap(), Command::Get(Query::Tone));
        assert_eq!(
            parse("get si570_multiplier").unwrap(),
            Command::Get(Query::Si570Multiplier)
        );
        assert_eq!(
            parse("get local_multiplier").unwrap(),
            Command::Get(Query::LocalMultiplier)
        );
    }

    #[test]
    fn get_queries_by_first_letter() {
        assert_eq!(parse("get p").unwrap(), Command::Get(Query::Ptt));
        assert_eq!(parse("get frequency").unwrap(), Command::Get(Query::Frequency));
        assert_eq!(parse("get t").unwrap(), Command::Get(Query::Tone));
        assert_eq!(parse("get k").unwrap(), Command::Get(Query::Keys));
    }

    #[test]
    fn unknown_noun() {
        match parse("get x") {
            Err(ParseError::UnknownNoun { verb, noun }) => {
                assert_eq!(verb, "get");
                assert_eq!(noun, "x");
            }
            other => panic!("expected UnknownNoun, got {:?}", other),
        }
        assert!(matches!(
            parse("set si570_multiplier 4"),
            Err(ParseError::UnknownNoun { verb: "set", .. })
        ));
    }

    #[test]
    fn switches() {
        assert_eq!(parse("set ptt on").unwrap(), Command::SetPtt(true));
        assert_eq!(parse("set ptt only").unwrap(), Command::SetPtt(true));
        assert_eq!(parse("set ptt off").unwrap(), Command::SetPtt(false));
        assert_eq!(parse("set ptt 1").unwrap(), Command::SetPtt(false));
        assert_eq!(parse("set bpf on").unwrap(), Command::SetBpf(true));
    }

    #[test]
    fn numeric_arguments() {
        assert_eq!(
            parse("set freq 7.05").unwrap(),
            Command::SetFrequency(7.05)
        );
        assert_eq!(parse("set tone 650.7").unwrap(), Command::SetTone(650));
        assert_eq!(
            parse("set local_multiplier 8").unwrap(),
            Command::SetLocalMultiplier(8.0)
        );
        assert!(matches!(
            parse("set freq abc"),
            Err(ParseError::InvalidNumber(t)) if t == "abc"
        ));
        assert!(matches!(
            parse("set freq inf"),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn short_and_long_requests() {
        assert!(matches!(
            Command::from_tokens::<&str>(&[]),
            Err(ParseError::Empty)
        ));
        assert!(matches!(parse("get"), Err(ParseError::MissingArgument("get"))));
        assert!(matches!(
            parse("set freq"),
            Err(ParseError::MissingArgument("freq"))
        ));
        assert!(matches!(
            parse("set freq 7 8"),
            Err(ParseError::TooManyTokens { max: 3, got: 4 })
        ));
        assert!(matches!(parse("status"), Err(ParseError::UnknownVerb(_))));
        // verbs are case sensitive
        assert!(matches!(parse("GET ptt"), Err(ParseError::UnknownVerb(_))));
    }

    #[test]
    fn commands_display_as_requests() {
        let commands = [
            Command::Get(Query::Frequency),
            Command::SetPtt(true),
            Command::SetBpf(false),
            Command::SetFrequency(14.074),
            Command::SetTone(700),
            Command::SetLocalMultiplier(2.0),
        ];
        for command in commands {
            assert_eq!(parse(&command.to_string()).unwrap(), command);
        }
    }

    #[test]
    fn reply_display() {
        assert_eq!(Reply::ok().to_string(), "ok");
        assert_eq!(Reply::value(format!("{:.6}", 8.0)).to_string(), "ok 8.000000");
        assert_eq!(Reply::Error.to_string(), "error");
    }
}
