use color_eyre::eyre::{Result, eyre};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use wsecho::common::{spawn_test_server, spawn_test_server_with_handler};
use wsecho::websocket::ws_url;
use wsecho::{
    EchoClient, EchoError, EchoHandler, EchoMessage, MessageKind, WebSocketConfig,
    WebSocketEchoClient,
};

fn loopback() -> WebSocketConfig {
    WebSocketConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
}

async fn wait_for_stop(handle: tokio::task::JoinHandle<wsecho::Result<()>>) -> Result<()> {
    timeout(Duration::from_secs(5), handle)
        .await
        .map_err(|_| eyre!("server did not stop after the client closed"))???;
    Ok(())
}

/// Connect, echo text and binary, close, and expect the server to stop
#[tokio::test]
async fn test_end_to_end_scenario() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    client.send_text("hello").await?;
    let reply = client.receive().await?;
    assert_eq!(reply.kind(), MessageKind::Text);
    assert_eq!(reply.as_text(), Some("hello"));

    client.send_binary(vec![0x01, 0x02]).await?;
    let reply = client.receive().await?;
    assert_eq!(reply.kind(), MessageKind::Binary);
    assert_eq!(reply.payload().as_ref(), &[0x01, 0x02]);

    client.close().await?;
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_utf8_text_round_trip() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    for message in ["foo", "∆AIMON", "日本語のテキスト", "emoji 🦀"] {
        assert_eq!(client.echo_string(message).await?, message);
    }

    client.close().await?;
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_replies_preserve_order() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    // Send everything before reading anything
    let sent: Vec<EchoMessage> = (0..50)
        .map(|i| {
            if i % 2 == 0 {
                EchoMessage::text(format!("message {i}"))
            } else {
                EchoMessage::binary(vec![i as u8; i])
            }
        })
        .collect();
    for message in &sent {
        client.send(message.clone()).await?;
    }

    for expected in &sent {
        assert_eq!(&client.receive().await?, expected);
    }

    client.close().await?;
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_empty_and_large_messages() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    assert_eq!(client.echo(&[]).await?, Vec::<u8>::new());
    assert_eq!(client.echo_string("").await?, "");

    let large: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    assert_eq!(client.echo(&large).await?, large);

    client.close().await?;
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_ping_is_answered_not_echoed() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    client.ping(&b"are you there"[..]).await?;

    // The next data message is the echo of this text, not the ping payload
    assert_eq!(client.echo_string("after ping").await?, "after ping");

    client.close().await?;
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_no_messages_after_close() -> Result<()> {
    let (server_handle, addr) = spawn_test_server().await?;
    let client = WebSocketEchoClient::connect(&ws_url(addr)).await?;
    client.close().await?;
    wait_for_stop(server_handle).await?;

    let late = WebSocketEchoClient::connect(&ws_url(addr)).await;
    assert!(late.is_err(), "stopped server must not accept new clients");
    Ok(())
}

#[tokio::test]
async fn test_oversized_message_is_rejected() -> Result<()> {
    let config = loopback().with_size_limits(1024, 1024);
    let (server_handle, addr) = spawn_test_server_with_handler(EchoHandler::new(), config).await?;
    let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;

    client.send_binary(vec![0u8; 4096]).await?;
    let result = client.receive().await;
    assert!(
        matches!(result, Err(EchoError::ConnectionClosed) | Err(EchoError::WebSocket(_))),
        "unexpected result: {result:?}"
    );

    // The failed connection still counts as closed
    wait_for_stop(server_handle).await
}

#[tokio::test]
async fn test_multiple_clients_with_persistent_handler() -> Result<()> {
    let (server_handle, addr) =
        spawn_test_server_with_handler(EchoHandler::persistent(), loopback()).await?;

    let mut handles = Vec::new();
    for i in 0..5 {
        handles.push(tokio::spawn(async move {
            let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await?;
            let message = format!("Message from client {i}");
            let response = client.echo_string(&message).await?;
            assert_eq!(response, message);
            client.close().await?;
            Ok::<(), EchoError>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }

    assert!(!server_handle.is_finished());
    server_handle.abort();
    Ok(())
}
