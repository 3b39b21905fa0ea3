//! [tokio_util::codec] implementations for use with datagram sockets.
//!
//! Each datagram carries exactly one request or reply, so decoding always consumes
//! the complete buffer.
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{codec::Request, error::ParseError, protocol::Command, protocol::Reply};

/// Client side codec: encodes commands and decodes replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientCodec;

/// Daemon side codec: decodes requests and encodes replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct DaemonCodec;

impl Encoder<Command> for ClientCodec {
    type Error = ParseError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(item.to_string().as_bytes());
        Ok(())
    }
}

impl Decoder for ClientCodec {
    type Item = Reply;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split_to(src.len());
        Reply::from_datagram(&datagram).map(Some)
    }
}

impl Encoder<Reply> for DaemonCodec {
    type Error = ParseError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(item.to_string().as_bytes());
        Ok(())
    }
}

impl Decoder for DaemonCodec {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split_to(src.len());
        Request::from_datagram(&datagram).map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::Query;

    #[test]
    fn client_round_trip() {
        let mut buf = BytesMut::new();
        ClientCodec
            .encode(Command::Get(Query::Frequency), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"get freq");

        let mut reply = BytesMut::from(&b"ok 7.074000"[..]);
        let decoded = ClientCodec.decode(&mut reply).unwrap();
        assert_eq!(decoded, Some(Reply::value("7.074000")));
        assert!(reply.is_empty());
        assert_eq!(ClientCodec.decode(&mut reply).unwrap(), None);
    }

    #[test]
    fn daemon_decodes_whole_datagram() {
        let mut buf = BytesMut::from(&b"set ptt on"[..]);
        let request = DaemonCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.to_command().unwrap(), Command::SetPtt(true));
        assert!(buf.is_empty());

        let mut out = BytesMut::new();
        DaemonCodec.encode(Reply::Error, &mut out).unwrap();
        assert_eq!(&out[..], b"error");
    }
}
