//! Tokio based client for applications that already run an async runtime.
use std::{io, time::Duration};

use bytes::BytesMut;
use softrock_protocol::{Command, Query, Reply, framed::ClientCodec};
use tokio::net::{ToSocketAddrs, UdpSocket, lookup_host};
use tokio_util::codec::{Decoder, Encoder};

use crate::{ClientError, DEFAULT_TIMEOUT, MAX_REPLY_LEN, local_addr_for, reply_done, reply_value};

/// Async UDP client for the daemon.
pub struct AsyncSoftrockClient {
    socket: UdpSocket,
    codec: ClientCodec,
    timeout: Duration,
}

impl AsyncSoftrockClient {
    pub async fn new(addr: impl ToSocketAddrs) -> io::Result<AsyncSoftrockClient> {
        let peer = lookup_host(addr).await?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Address resolved to nothing")
        })?;
        let socket = UdpSocket::bind(local_addr_for(&peer)).await?;
        socket.connect(peer).await?;
        Ok(AsyncSoftrockClient {
            socket,
            codec: ClientCodec,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send a command and wait for its reply.
    pub async fn request(&mut self, command: Command) -> Result<Reply, ClientError> {
        let mut out = BytesMut::with_capacity(32);
        self.codec.encode(command, &mut out)?;
        self.socket.send(&out).await?;

        let mut buf = [0u8; MAX_REPLY_LEN];
        let len = tokio::time::timeout(self.timeout, self.socket.recv(&mut buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "No reply from daemon"))??;
        let mut datagram = BytesMut::from(&buf[..len]);
        self.codec
            .decode(&mut datagram)?
            .ok_or(ClientError::InvalidValue(None))
    }

    /// Ask the daemon to terminate. The daemon does not answer.
    pub async fn quit(&self) -> io::Result<()> {
        self.socket.send(softrock_protocol::QUIT).await?;
        Ok(())
    }

    pub async fn frequency(&mut self) -> Result<f64, ClientError> {
        reply_value(self.request(Command::Get(Query::Frequency)).await?)
    }

    pub async fn set_frequency(&mut self, mhz: f64) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetFrequency(mhz)).await?)
    }

    pub async fn ptt(&mut self) -> Result<bool, ClientError> {
        reply_value::<u8>(self.request(Command::Get(Query::Ptt)).await?).map(|ptt| ptt != 0)
    }

    pub async fn set_ptt(&mut self, on: bool) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetPtt(on)).await?)
    }

    pub async fn local_multiplier(&mut self) -> Result<f64, ClientError> {
        reply_value(self.request(Command::Get(Query::LocalMultiplier)).await?)
    }

    pub async fn set_local_multiplier(&mut self, factor: f64) -> Result<(), ClientError> {
        reply_done(self.request(Command::SetLocalMultiplier(factor)).await?)
    }
}
