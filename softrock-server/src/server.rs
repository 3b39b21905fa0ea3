use std::{
    error::Error,
    fmt::Display,
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use softrock_protocol::{
    Reply,
    codec::{Request, is_quit},
};

use crate::{Si570Device, dispatch::Dispatcher};

/// UDP port the daemon listens on by default.
pub const DEFAULT_PORT: u16 = 19004;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Longer datagrams are truncated by the socket
    pub max_datagram_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_datagram_len: 1024,
        }
    }
}

/// Errors that terminate the daemon.
#[derive(Debug)]
pub enum ServerError {
    Bind(io::Error),
    Send(io::Error),
    ShortSend { expected: usize, sent: usize },
}

impl Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(error) => write!(f, "Error binding socket: {}", error),
            ServerError::Send(error) => write!(f, "Failed to send reply: {}", error),
            ServerError::ShortSend { expected, sent } => {
                write!(f, "Failed to send reply: sent {} of {} bytes", sent, expected)
            }
        }
    }
}

impl Error for ServerError {}

/// UDP daemon answering one request at a time.
#[derive(Debug)]
pub struct Server<D: Si570Device> {
    dispatcher: Dispatcher<D>,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use softrock_server::server::Builder;
///
/// let server = Builder::new()
///     .port(19005)
///     .build(dispatcher);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the UDP port used by [Server::listen_on_port]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the size of the receive buffer
    pub fn max_datagram_len(mut self, len: usize) -> Self {
        self.config.max_datagram_len = len;
        self
    }

    /// Build and return the server
    pub fn build<D: Si570Device>(self, dispatcher: Dispatcher<D>) -> Server<D> {
        Server::new(dispatcher, self.config)
    }
}

impl<D: Si570Device> Server<D> {
    pub fn new(dispatcher: Dispatcher<D>, config: Config) -> Server<D> {
        Server { dispatcher, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<D> {
        self.dispatcher
    }

    /// Listen on all interfaces on the configured port.
    pub fn listen_on_port(&mut self) -> Result<(), ServerError> {
        self.listen(("0.0.0.0", self.config.port))
    }

    pub fn listen(&mut self, addr: impl ToSocketAddrs) -> Result<(), ServerError> {
        let socket = UdpSocket::bind(addr).map_err(ServerError::Bind)?;
        if let Ok(addr) = socket.local_addr() {
            log::info!("Listening for commands on {}", addr);
        }
        self.serve(socket)
    }

    /// Serve requests on an already bound socket until `quit` is received.
    pub fn serve(&mut self, socket: UdpSocket) -> Result<(), ServerError> {
        let mut buffer = vec![0u8; self.config.max_datagram_len];
        loop {
            let (len, peer) = match socket.recv_from(&mut buffer) {
                Ok(received) => received,
                Err(e) => {
                    log::error!("Receive error: {}", e);
                    continue;
                }
            };
            let payload = &buffer[..len];
            log::debug!(
                "Received {} bytes from {}: {}",
                len,
                peer,
                String::from_utf8_lossy(payload)
            );

            if is_quit(payload) {
                log::info!("Quit command received");
                return Ok(());
            }

            let reply = self.handle_datagram(payload);
            self.send_reply(&socket, &reply, peer)?;
        }
    }

    /// Turn one datagram into its reply.
    pub fn handle_datagram(&mut self, payload: &[u8]) -> Reply {
        match Request::from_datagram(payload) {
            Ok(request) => self.dispatcher.dispatch(request.tokens()),
            Err(e) => {
                log::debug!("Invalid request: {}", e);
                Reply::Error
            }
        }
    }

    fn send_reply(
        &self,
        socket: &UdpSocket,
        reply: &Reply,
        peer: SocketAddr,
    ) -> Result<(), ServerError> {
        let mut out = Vec::with_capacity(32);
        reply.write_to(&mut out).map_err(ServerError::Send)?;
        log::trace!("Replying to {}: {}", peer, reply);
        let sent = socket.send_to(&out, peer).map_err(ServerError::Send)?;
        if sent != out.len() {
            return Err(ServerError::ShortSend {
                expected: out.len(),
                sent,
            });
        }
        Ok(())
    }
}
