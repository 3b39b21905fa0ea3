use bytes::BytesMut;
use softrock_client::{ClientError, SoftrockClient, async_client::AsyncSoftrockClient};
use softrock_protocol::{Command, Query, Reply, framed::DaemonCodec};
use softrock_server::dispatch::SessionConfig;
use softrock_tests::{MockDevice, spawn_daemon};
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};

#[test]
fn blocking_client_against_daemon() {
    let device = MockDevice::default();
    device.state().keys = 2;
    device.state().lo_multiply = 1.5;
    let daemon = spawn_daemon(device.clone(), SessionConfig::default()).unwrap();
    let client = SoftrockClient::new(daemon.addr).unwrap();

    client.set_frequency(7.074).unwrap();
    assert!((client.frequency().unwrap() - 7.074).abs() < 1e-6);
    assert!((device.state().raw_mhz - 28.296).abs() < 1e-9);

    assert!(!client.ptt().unwrap());
    client.set_ptt(true).unwrap();
    assert!(client.ptt().unwrap());

    assert_eq!(client.keys().unwrap(), 2);
    assert_eq!(client.tone().unwrap(), 700);
    client.set_tone(800).unwrap();
    assert_eq!(client.tone().unwrap(), 800);

    client.set_bpf(false).unwrap();
    assert_eq!(device.state().bpf, Some(false));

    assert_eq!(client.si570_multiplier().unwrap(), 1.5);
    assert_eq!(client.local_multiplier().unwrap(), 4.0);
    client.set_local_multiplier(2.0).unwrap();
    assert!((client.frequency().unwrap() - 14.148).abs() < 1e-6);
    assert!(matches!(
        client.set_local_multiplier(-1.0),
        Err(ClientError::Rejected)
    ));

    client.quit().unwrap();
    let dispatcher = daemon.handle.join().unwrap().unwrap();
    assert_eq!(dispatcher.state().cw_tone, 800);
}

#[tokio::test(flavor = "multi_thread")]
async fn async_client_against_daemon() {
    let device = MockDevice::with_frequency(56.296);
    let daemon = spawn_daemon(device.clone(), SessionConfig::default()).unwrap();
    let mut client = AsyncSoftrockClient::new(daemon.addr).await.unwrap();

    assert!((client.frequency().await.unwrap() - 14.074).abs() < 1e-6);
    client.set_frequency(10.1387).await.unwrap();
    assert!((device.state().raw_mhz - 40.5548).abs() < 1e-9);

    client.set_ptt(true).await.unwrap();
    assert!(client.ptt().await.unwrap());
    client.set_local_multiplier(1.0).await.unwrap();
    assert_eq!(client.local_multiplier().await.unwrap(), 1.0);

    client.quit().await.unwrap();
    tokio::task::spawn_blocking(move || daemon.handle.join())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn async_client_against_codec_peer() {
    // A minimal daemon built from the datagram codec alone
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = peer.local_addr().unwrap();
    let responder = tokio::spawn(async move {
        let mut codec = DaemonCodec;
        let mut buf = [0u8; 64];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        let request = codec
            .decode(&mut BytesMut::from(&buf[..len]))
            .unwrap()
            .unwrap();
        assert_eq!(request.to_command().unwrap(), Command::Get(Query::Frequency));

        let mut out = BytesMut::new();
        codec.encode(Reply::value("7.074000"), &mut out).unwrap();
        peer.send_to(&out, from).await.unwrap();
    });

    let mut client = AsyncSoftrockClient::new(addr).await.unwrap();
    assert_eq!(client.frequency().await.unwrap(), 7.074);
    responder.await.unwrap();
}
