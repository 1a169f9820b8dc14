//! Integration tests for the WebSocket transports.
//!
//! These spin up a real server transport on an OS-assigned port and drive
//! it with raw `tokio-tungstenite` clients, so session bookkeeping and
//! event delivery are verified over actual sockets.

#![cfg(feature = "websocket")]

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use opwire_protocol::SessionId;
use opwire_transport::{
    ClientConfig, Transport, TransportEvent, WsClientTransport,
    WsServerTransport,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::Message;

type RawClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn bind_server() -> (WsServerTransport, UnboundedReceiver<TransportEvent>, String)
{
    let (transport, events) = WsServerTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().to_string();
    (transport, events, addr)
}

async fn connect_raw(addr: &str) -> RawClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

async fn next_event(
    events: &mut UnboundedReceiver<TransportEvent>,
) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event channel closed unexpectedly")
}

#[tokio::test]
async fn test_connect_emits_connected_and_tracks_session() {
    let (transport, mut events, addr) = bind_server().await;

    let _client = connect_raw(&addr).await;
    let sid = match next_event(&mut events).await {
        TransportEvent::Connected(sid) => sid,
        other => panic!("expected Connected, got {other:?}"),
    };

    assert_eq!(sid, SessionId::new(1));
    assert_eq!(transport.session_ids(), vec![sid]);
    assert!(transport.connected_at(sid).is_some());
}

#[tokio::test]
async fn test_session_ids_monotonic_across_disconnect() {
    let (transport, mut events, addr) = bind_server().await;

    let mut first = connect_raw(&addr).await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Connected(sid) if sid == SessionId::new(1)
    ));
    let _second = connect_raw(&addr).await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Connected(sid) if sid == SessionId::new(2)
    ));

    first.close(None).await.expect("close should succeed");
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Disconnected(sid) if sid == SessionId::new(1)
    ));

    // A later connection must not reuse the vacated id.
    let _third = connect_raw(&addr).await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Connected(sid) if sid == SessionId::new(3)
    ));

    let mut ids = transport.session_ids();
    ids.sort();
    assert_eq!(ids, vec![SessionId::new(2), SessionId::new(3)]);
}

#[tokio::test]
async fn test_binary_messages_forwarded_in_order() {
    let (_transport, mut events, addr) = bind_server().await;

    let mut client = connect_raw(&addr).await;
    let sid = match next_event(&mut events).await {
        TransportEvent::Connected(sid) => sid,
        other => panic!("expected Connected, got {other:?}"),
    };

    for payload in [&b"one"[..], b"two", b"three"] {
        client
            .send(Message::Binary(Bytes::copy_from_slice(payload)))
            .await
            .expect("send should succeed");
    }

    for expected in [&b"one"[..], b"two", b"three"] {
        match next_event(&mut events).await {
            TransportEvent::Binary(got_sid, data) => {
                assert_eq!(got_sid, sid);
                assert_eq!(&data[..], expected);
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_text_frames_are_ignored() {
    let (_transport, mut events, addr) = bind_server().await;

    let mut client = connect_raw(&addr).await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Connected(_)
    ));

    client
        .send(Message::Text("not part of the protocol".into()))
        .await
        .expect("send should succeed");
    client
        .send(Message::Binary(Bytes::from_static(b"binary")))
        .await
        .expect("send should succeed");

    // The text frame produces no event; the next thing seen is the
    // binary message.
    match next_event(&mut events).await {
        TransportEvent::Binary(_, data) => assert_eq!(&data[..], b"binary"),
        other => panic!("expected Binary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_reaches_client_and_dead_id_is_noop() {
    let (transport, mut events, addr) = bind_server().await;

    let mut client = connect_raw(&addr).await;
    let sid = match next_event(&mut events).await {
        TransportEvent::Connected(sid) => sid,
        other => panic!("expected Connected, got {other:?}"),
    };

    transport.send(sid, Bytes::from_static(b"hello"));
    let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .expect("recv should succeed");
    assert_eq!(msg, Message::Binary(Bytes::from_static(b"hello")));

    // Unknown session: silently dropped.
    transport.send(SessionId::new(999), Bytes::from_static(b"void"));
}

#[tokio::test]
async fn test_close_session_disconnects_client() {
    let (transport, mut events, addr) = bind_server().await;

    let mut client = connect_raw(&addr).await;
    let sid = match next_event(&mut events).await {
        TransportEvent::Connected(sid) => sid,
        other => panic!("expected Connected, got {other:?}"),
    };

    transport.close_session(sid, 1000, "done");

    // The client observes the close frame.
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out")
            .expect("stream ended");
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        }
    }

    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Disconnected(got) if got == sid
    ));
    assert!(transport.session_ids().is_empty());

    // Closing again, or closing an unknown session, is a no-op.
    transport.close_session(sid, 1000, "done");
    transport.close_session(SessionId::new(999), 1000, "done");
}

#[tokio::test]
async fn test_stop_closes_sessions_and_is_idempotent() {
    let (transport, mut events, addr) = bind_server().await;

    let mut client = connect_raw(&addr).await;
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Connected(_)
    ));

    transport.stop().await;
    transport.stop().await;

    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out")
            .expect("stream ended");
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        }
    }

    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Disconnected(_)
    ));
}

#[tokio::test]
async fn test_stop_racing_connects_leaves_no_lingering_sessions() {
    let (transport, _events, addr) = bind_server().await;

    // Connections racing the shutdown must each end up in one of two
    // states: rejected before admission, or admitted and told to close.
    let mut clients = Vec::new();
    for _ in 0..8 {
        let addr = addr.clone();
        clients.push(tokio::spawn(async move {
            let connected = tokio::time::timeout(
                Duration::from_secs(2),
                tokio_tungstenite::connect_async(format!("ws://{addr}")),
            )
            .await;
            let mut ws = match connected {
                Ok(Ok((ws, _))) => ws,
                // Never admitted; nothing is tracked for this one.
                _ => return true,
            };
            loop {
                match tokio::time::timeout(Duration::from_secs(5), ws.next())
                    .await
                {
                    Ok(Some(Ok(Message::Close(_))))
                    | Ok(Some(Err(_)))
                    | Ok(None) => return true,
                    Ok(Some(Ok(_))) => continue,
                    Err(_) => return false,
                }
            }
        }));
    }

    transport.stop().await;

    for client in clients {
        assert!(
            client.await.expect("client task panicked"),
            "an admitted session never received a close"
        );
    }
}

#[tokio::test]
async fn test_bind_failure_surfaces() {
    let (transport, _events, addr) = bind_server().await;
    let result = WsServerTransport::bind(&addr).await;
    assert!(result.is_err());
    drop(transport);
}

#[tokio::test]
async fn test_client_transport_round_trip() {
    let (server, mut server_events, addr) = bind_server().await;

    let (client, mut client_events) = WsClientTransport::connect(
        &format!("ws://{addr}"),
        ClientConfig::default(),
    )
    .await
    .expect("client should connect");

    // Fixed local id, default 0.
    assert_eq!(client.session_id(), SessionId::new(0));
    assert!(matches!(
        next_event(&mut client_events).await,
        TransportEvent::Connected(sid) if sid == SessionId::new(0)
    ));
    let server_sid = match next_event(&mut server_events).await {
        TransportEvent::Connected(sid) => sid,
        other => panic!("expected Connected, got {other:?}"),
    };

    // Client → server.
    client.send(SessionId::new(0), Bytes::from_static(b"up"));
    match next_event(&mut server_events).await {
        TransportEvent::Binary(sid, data) => {
            assert_eq!(sid, server_sid);
            assert_eq!(&data[..], b"up");
        }
        other => panic!("expected Binary, got {other:?}"),
    }

    // Server → client.
    server.send(server_sid, Bytes::from_static(b"down"));
    match next_event(&mut client_events).await {
        TransportEvent::Binary(sid, data) => {
            assert_eq!(sid, SessionId::new(0));
            assert_eq!(&data[..], b"down");
        }
        other => panic!("expected Binary, got {other:?}"),
    }

    // Sends for a foreign id are dropped.
    client.send(SessionId::new(7), Bytes::from_static(b"lost"));

    client.stop().await;
    client.stop().await;
    assert!(matches!(
        next_event(&mut client_events).await,
        TransportEvent::Disconnected(_)
    ));
    assert!(client.session_ids().is_empty());

    assert!(matches!(
        next_event(&mut server_events).await,
        TransportEvent::Disconnected(sid) if sid == server_sid
    ));
}
