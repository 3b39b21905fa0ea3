//! # SoftRock Protocol Library
//!
//! Text protocol and frequency math shared by the `usbsoftrock` command line tool,
//! its UDP daemon and clients talking to that daemon.
//!
//! ## Overview
//!
//! SoftRock style receivers use an Si570 oscillator behind a small USB microcontroller.
//! Software controls it with a tiny command vocabulary, either from the command line or
//! as UDP datagrams sent to a running daemon. This crate implements:
//!
//! - The command vocabulary ([`Command`], [`Query`]) and its resolution from tokens
//! - Request tokenization and reply encoding for datagrams ([`codec`])
//! - The conversion between device and user frequencies ([`units::Multiplier`])
//! - Si570 register math and the firmware's fixed point formats ([`si570`])
//!
//! ## Basic Usage
//!
//! ### Parsing a Request
//!
//! ```
//! use softrock_protocol::{Command, codec::Request};
//!
//! let request = Request::from_datagram(b"set freq 7.074").expect("Request should parse");
//! let command = request.to_command().expect("Command should resolve");
//! assert_eq!(command, Command::SetFrequency(7.074));
//! ```
//!
//! ### Writing a Reply
//!
//! ```
//! use softrock_protocol::Reply;
//!
//! let mut buffer = Vec::new();
//! Reply::value("1").write_to(&mut buffer).expect("Writing to vector shouldn't fail");
//! assert_eq!(buffer, b"ok 1");
//! ```
//!
//! ## Message Format
//!
//! Requests are ASCII tokens separated by spaces, at most three per datagram:
//!
//! - `get <ptt|keys|freq|tone|si570_multiplier|local_multiplier>`
//! - `set <ptt|bpf> <on|off>`
//! - `set <freq|tone|local_multiplier> <number>`
//! - `quit` stops the daemon
//!
//! Replies are `ok`, `ok <value>` or `error`. Frequencies use six decimals.
//!
//! ## Error Handling
//!
//! Parsing failures are reported through [`error::ParseError`]. A daemon answers every
//! failure with `error`.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
#[cfg(feature = "tokio")]
pub mod framed;
pub mod si570;
pub mod units;
