//! # SoftRock Client
//!
//! Send commands to a `usbsoftrock -d` daemon over UDP.
//!
//! ## Overview
//!
//! The daemon answers each request datagram with exactly one reply datagram. This crate
//! wraps that exchange in typed methods. [`SoftrockClient`] uses a blocking socket,
//! [`async_client::AsyncSoftrockClient`] a tokio socket.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use softrock_client::SoftrockClient;
//!
//! let mut client = SoftrockClient::new("127.0.0.1:19004")?;
//! client.set_frequency(7.074)?;
//! println!("Tuned to {:.6} MHz", client.frequency()?);
//! client.set_ptt(true)?;
//! ```
//!
//! ## Related Crates
//!
//! - [`softrock_protocol`] - Command vocabulary and reply format
//! - [`softrock_server`](https://docs.rs/softrock-server/) - The daemon implementation
use std::{
    error::Error,
    fmt::Display,
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket},
    str::FromStr,
    time::Duration,
};

use softrock_protocol::{Command, Query, Reply, error::ParseError};

pub mod async_client;

/// How long to wait for a reply before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const MAX_REPLY_LEN: usize = 128;

#[derive(Debug)]
pub enum ClientError {
    IoError(io::Error),
    Parse(ParseError),
    /// The daemon answered `error`
    Rejected,
    /// The reply carried no or an unexpected value
    InvalidValue(Option<String>),
}

impl From<io::Error> for ClientError {
    fn from(value: io::Error) -> Self {
        ClientError::IoError(value)
    }
}

impl From<ParseError> for ClientError {
    fn from(value: ParseError) -> Self {
        ClientError::Parse(value)
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::IoError(error) => write!(f, "{}", error),
            ClientError::Parse(error) => write!(f, "{}", error),
            ClientError::Rejected => write!(f, "The daemon rejected the command"),
            ClientError::InvalidValue(Some(value)) => write!(f, "Unexpected value {}", value),
            ClientError::InvalidValue(None) => write!(f, "Reply carried no value"),
        }
    }
}

impl Error for ClientError {}

/// Local address of the same family as `peer`, with an OS assigned port.
pub(crate) fn local_addr_for(peer: &SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

pub(crate) fn resolve(addr: impl ToSocketAddrs) -> io::Result<SocketAddr> {
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Address resolved to nothing")
    })
}

/// Extract a value from a reply, turning `error` into [ClientError::Rejected].
pub(crate) fn reply_value<T: FromStr>(reply: Reply) -> Result<T, ClientError> {
    match reply {
        Reply::Error => Err(ClientError::Rejected),
        Reply::Ok(None) => Err(ClientError::InvalidValue(None)),
        Reply::Ok(Some(value)) => value
            .parse()
            .map_err(|_| ClientError::InvalidValue(Some(value))),
    }
}

pub(crate) fn reply_done(reply: Reply) -> Result<(), ClientError> {
    match reply {
        Reply::Error => Err(ClientError::Rejected),
        Reply::Ok(_) => Ok(()),
    }
}

/// Blocking UDP client for the daemon.
pub struct SoftrockClient {
    socket: UdpSocket,
}

impl SoftrockClient {
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<SoftrockClient> {
        let peer = resolve(addr)?;
        let socket = UdpSocket::bind(local_addr_for(&peer))?;
        socket.connect(peer)?;
        socket.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
        Ok(SoftrockClient { socket })
    }

    /// Change how long to wait for replies. `None` waits forever.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    /// Send a command and wait for its reply.
    pub fn request(&self, command: Command) -> Result<Reply, ClientError> {
        let mut out = Vec::with_capacity(32);
        command.write_to(&mut out)?;
        self.socket.send(&out)?;
        let mut buf = [0u8; MAX_REPLY_LEN];
        let len = self.socket.recv(&mut buf)?;
        Ok(Reply::from_datagram(&buf[..len])?)
    }

    /// Ask the daemon to terminate. The daemon does not answer.
    pub fn quit(&self) -> io::Result<()> {
        self.socket.send(softrock_protocol::QUIT)?;
        Ok(())
    }

    /// Frequency in MHz, after the daemon's local multiplier.
    pub fn frequency(&self) -> Result<f64, ClientError> {
        reply_value(self.request(Command::Get(Query::Frequency))?)
    }

    pub fn set_frequency(&self, mhz: f64) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetFrequency(mhz))?)
    }

    pub fn ptt(&self) -> Result<bool, ClientError> {
        reply_value::<u8>(self.request(Command::Get(Query::Ptt))?).map(|ptt| ptt != 0)
    }

    pub fn set_ptt(&self, on: bool) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetPtt(on))?)
    }

    pub fn keys(&self) -> Result<u8, ClientError> {
        reply_value(self.request(Command::Get(Query::Keys))?)
    }

    pub fn tone(&self) -> Result<i32, ClientError> {
        reply_value(self.request(Command::Get(Query::Tone))?)
    }

    pub fn set_tone(&self, hz: i32) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetTone(hz))?)
    }

    pub fn set_bpf(&self, enabled: bool) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetBpf(enabled))?)
    }

    pub fn si570_multiplier(&self) -> Result<f64, ClientError> {
        reply_value(self.request(Command::Get(Query::Si570Multiplier))?)
    }

    pub fn local_multiplier(&self) -> Result<f64, ClientError> {
        reply_value(self.request(Command::Get(Query::LocalMultiplier))?)
    }

    pub fn set_local_multiplier(&self, factor: f64) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetLocalMultiplier(factor))?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn values_from_replies() {
        assert_eq!(reply_value::<f64>(Reply::value("7.074000")).unwrap(), 7.074);
        assert_eq!(reply_value::<u8>(Reply::value("1")).unwrap(), 1);
        assert!(matches!(
            reply_value::<f64>(Reply::Error),
            Err(ClientError::Rejected)
        ));
        assert!(matches!(
            reply_value::<f64>(Reply::ok()),
            Err(ClientError::InvalidValue(None))
        ));
        assert!(matches!(
            reply_value::<u8>(Reply::value("on")),
            Err(ClientError::InvalidValue(Some(v))) if v == "on"
        ));
        assert!(reply_done(Reply::ok()).is_ok());
        assert!(matches!(reply_done(Reply::Error), Err(ClientError::Rejected)));
    }

    #[test]
    fn local_address_matches_family() {
        let v4: SocketAddr = "127.0.0.1:19004".parse().unwrap();
        assert!(local_addr_for(&v4).is_ipv4());
        let v6: SocketAddr = "[::1]:19004".parse().unwrap();
        assert!(local_addr_for(&v6).is_ipv6());
    }

    #[test]
    fn request_against_echo_peer() {
        // A peer that answers every datagram with "ok 1"
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = peer.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (len, from) = peer.recv_from(&mut buf).unwrap();
            assert_eq!(&buf[..len], b"get ptt");
            peer.send_to(b"ok 1", from).unwrap();
        });
        let client = SoftrockClient::new(addr).unwrap();
        assert!(client.ptt().unwrap());
        handle.join().unwrap();
    }
}
