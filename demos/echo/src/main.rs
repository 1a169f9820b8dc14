//! Chat echo demo: a server that fans every chat line out to all connected
//! sessions, plus an in-process client that sends one line and prints the
//! broadcast it gets back.
//!
//! Run with `cargo run -p echo-demo`. Set `RUST_LOG=debug` for the full
//! dispatch trace.

mod protocol;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use opwire::prelude::*;
use opwire_transport::WsServerTransport;
use tracing_subscriber::EnvFilter;

use protocol::{
    ChatBroadcast, ChatClientProxy, ChatClientStub, ChatSend,
    ChatServerProxy, ChatServerStub,
};

/// Handed to the chat handler after the server is built; registration
/// happens before the transport (and thus the proxy) exists.
type ServerLink = (ChatServerProxy<JsonCodec>, Arc<WsServerTransport>);

fn build_server_runtime(
    link: Arc<OnceLock<ServerLink>>,
) -> ProtocolRuntime<JsonCodec> {
    let mut runtime = ProtocolRuntime::new(JsonCodec);
    ChatServerStub::register(&mut runtime);
    ChatServerStub::on_chat_send(&mut runtime, move |session, msg: ChatSend| {
        let link = Arc::clone(&link);
        async move {
            let (proxy, transport) =
                link.get().ok_or("server link not ready")?;
            tracing::info!(%session, text = %msg.text, "chat received");
            let event = ChatBroadcast {
                from: session.into_inner(),
                text: msg.text,
            };
            for peer in transport.session_ids() {
                proxy.send_chat_broadcast(peer, &event)?;
            }
            Ok(())
        }
    });
    runtime
}

fn build_client_runtime() -> ProtocolRuntime<JsonCodec> {
    let mut runtime = ProtocolRuntime::new(JsonCodec);
    ChatClientStub::register(&mut runtime);
    ChatClientStub::on_chat_broadcast(&mut runtime, |_, msg: ChatBroadcast| {
        async move {
            println!("[chat] session-{}: {}", msg.from, msg.text);
            Ok(())
        }
    });
    runtime
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let link: Arc<OnceLock<ServerLink>> = Arc::new(OnceLock::new());

    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(build_server_runtime(Arc::clone(&link)))
        .await?;
    let server_transport = server.transport();
    let addr = server_transport.local_addr();
    let _ = link.set((
        ChatServerProxy::new(server.proxy()),
        Arc::clone(&server_transport),
    ));
    tokio::spawn(server.run());
    tracing::info!(%addr, "chat server listening");

    let mut client = ProtocolClient::connect(
        &format!("ws://{addr}"),
        build_client_runtime(),
        EndpointHooks::default(),
        ClientOptions::default(),
    )
    .await?;
    let client_proxy = ChatClientProxy::new(client.proxy());
    let client_transport = client.transport();

    client_proxy.send_chat_send(
        SessionId::new(0),
        &ChatSend {
            text: "hello from the echo demo".into(),
        },
    )?;

    // Drain the client's event queue until both the connect notification
    // and the broadcast have been processed.
    let mut processed = 0;
    for _ in 0..100 {
        processed += client.poll().await;
        if processed >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    client_transport.stop().await;
    server_transport.stop().await;
    Ok(())
}
