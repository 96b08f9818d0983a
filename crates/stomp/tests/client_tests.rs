//! Client tests against an in-process WebSocket broker.
//!
//! Each test spins a real listener on a loopback port, performs the STOMP
//! handshake over it, and scripts the broker side frame by frame.

use futures::{SinkExt, StreamExt};
use stomp::{
    BusTransport, Command, ConnectOptions, Frame, SessionEvent, WsTransport,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerWs = WebSocketStream<TcpStream>;

fn frame_text(frame: &Frame) -> WsMessage {
    WsMessage::Text(
        String::from_utf8(frame.to_bytes()).unwrap().into(),
    )
}

/// Read frames until one with `command` arrives; panics on stream end.
async fn expect_frame(ws: &mut ServerWs, command: Command) -> Frame {
    loop {
        let msg = ws
            .next()
            .await
            .expect("stream ended waiting for frame")
            .expect("ws error waiting for frame");
        let bytes: Vec<u8> = match msg {
            WsMessage::Text(t) => t.as_str().as_bytes().to_vec(),
            WsMessage::Binary(b) => b.to_vec(),
            _ => continue,
        };
        if let Some(frame) = Frame::parse(&bytes).unwrap() {
            if frame.command == command {
                return frame;
            }
        }
    }
}

/// Accept one connection and complete the CONNECT/CONNECTED handshake.
async fn accept_and_connect(listener: TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();

    let connect = expect_frame(&mut ws, Command::Connect).await;
    assert_eq!(connect.get("accept-version"), Some("1.2"));

    let connected = Frame::new(Command::Connected).header("version", "1.2");
    ws.send(frame_text(&connected)).await.unwrap();
    ws
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn subscribes_and_receives_messages() {
    let (listener, url) = bind().await;

    let broker = tokio::spawn(async move {
        let mut ws = accept_and_connect(listener).await;

        let sub = expect_frame(&mut ws, Command::Subscribe).await;
        assert_eq!(sub.get("destination"), Some("/topic/prices"));
        assert!(sub.get("id").is_some());

        let msg = Frame::new(Command::Message)
            .header("destination", "/topic/prices")
            .header("subscription", sub.get("id").unwrap())
            .body(r#"{"rows":[{"id":1}]}"#);
        ws.send(frame_text(&msg)).await.unwrap();
    });

    let mut session = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .expect("connect");
    session.subscribe("/topic/prices").await.expect("subscribe");

    match session.recv().await {
        Some(SessionEvent::Message { destination, body }) => {
            assert_eq!(destination.as_deref(), Some("/topic/prices"));
            assert_eq!(body, br#"{"rows":[{"id":1}]}"#);
        }
        other => panic!("expected message, got {other:?}"),
    }

    session.disconnect().await;
    broker.await.unwrap();
}

#[tokio::test]
async fn publish_reaches_the_broker() {
    let (listener, url) = bind().await;

    let broker = tokio::spawn(async move {
        let mut ws = accept_and_connect(listener).await;
        let send = expect_frame(&mut ws, Command::Send).await;
        assert_eq!(send.get("destination"), Some("/topic/prices.request"));
        assert_eq!(send.body, b"START");
    });

    let mut session = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .unwrap();
    session
        .publish("/topic/prices.request", "START")
        .await
        .unwrap();

    broker.await.unwrap();
    session.disconnect().await;
}

#[tokio::test]
async fn broker_error_frame_surfaces_as_protocol_error() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept_and_connect(listener).await;
        let error = Frame::new(Command::Error)
            .header("message", "malformed frame received")
            .body("detail");
        ws.send(frame_text(&error)).await.unwrap();
        // Keep the socket open; the client reacts to the frame itself.
        let _ = expect_frame(&mut ws, Command::Disconnect).await;
    });

    let mut session = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .unwrap();

    match session.recv().await {
        Some(SessionEvent::ProtocolError(message)) => {
            assert_eq!(message, "malformed frame received");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }

    session.disconnect().await;
}

#[tokio::test]
async fn server_close_surfaces_as_disconnected() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept_and_connect(listener).await;
        ws.close(None).await.unwrap();
    });

    let mut session = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .unwrap();

    match session.recv().await {
        Some(SessionEvent::Disconnected) => {}
        other => panic!("expected disconnect, got {other:?}"),
    }
}

#[tokio::test]
async fn connect_rejected_by_error_frame() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let _ = expect_frame(&mut ws, Command::Connect).await;

        let error =
            Frame::new(Command::Error).header("message", "login refused");
        ws.send(frame_text(&error)).await.unwrap();
    });

    let err = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .err()
        .expect("connect should fail");
    assert!(err.to_string().contains("login refused"));
}

#[tokio::test]
async fn connect_fails_fast_on_refused_socket() {
    // Bind then drop so the port is (very likely) unoccupied.
    let (listener, url) = bind().await;
    drop(listener);

    let err = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .err()
        .expect("connect should fail");
    assert!(matches!(err, stomp::StompError::Transport { .. }));
}

#[tokio::test]
async fn heartbeat_newlines_are_ignored() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept_and_connect(listener).await;

        // Server-side heartbeats are bare EOLs; they must not surface as
        // events or kill the pump.
        ws.send(WsMessage::Text("\n".into())).await.unwrap();
        ws.send(WsMessage::Text("\n".into())).await.unwrap();

        let msg = Frame::new(Command::Message)
            .header("destination", "/topic/t")
            .body("{}");
        ws.send(frame_text(&msg)).await.unwrap();
    });

    let mut session = WsTransport
        .connect(&url, &ConnectOptions::default())
        .await
        .unwrap();

    match session.recv().await {
        Some(SessionEvent::Message { body, .. }) => assert_eq!(body, b"{}"),
        other => panic!("expected message, got {other:?}"),
    }
}
