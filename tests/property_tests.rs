use proptest::prelude::*;
use std::net::SocketAddr;
use wsecho::common::spawn_test_server_with_handler;
use wsecho::websocket::ws_url;
use wsecho::{EchoClient, EchoHandler, EchoMessage, WebSocketConfig, WebSocketEchoClient};

fn loopback() -> WebSocketConfig {
    WebSocketConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: binary messages come back byte-for-byte and still binary
    #[test]
    fn echo_preserves_binary(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        tokio_test::block_on(async {
            let (server_handle, addr) =
                spawn_test_server_with_handler(EchoHandler::new(), loopback())
                    .await
                    .map_err(|e| TestCaseError::fail(format!("Server setup failed: {}", e)))?;

            let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await
                .map_err(|e| TestCaseError::fail(format!("Client connection failed: {}", e)))?;

            let response = client.echo(&data).await
                .map_err(|e| TestCaseError::fail(format!("Echo failed: {}", e)))?;

            server_handle.abort();

            prop_assert_eq!(response, data);
            Ok(())
        })?;
    }

    /// Property: text messages come back unchanged and still text
    #[test]
    fn echo_preserves_strings(text in ".*") {
        tokio_test::block_on(async {
            let (server_handle, addr) =
                spawn_test_server_with_handler(EchoHandler::new(), loopback())
                    .await
                    .map_err(|e| TestCaseError::fail(format!("Server setup failed: {}", e)))?;

            let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await
                .map_err(|e| TestCaseError::fail(format!("Client connection failed: {}", e)))?;

            let response = client.echo_string(&text).await
                .map_err(|e| TestCaseError::fail(format!("Echo string failed: {}", e)))?;

            server_handle.abort();

            prop_assert_eq!(response, text);
            Ok(())
        })?;
    }

    /// Property: a burst of mixed messages is echoed in order with framing intact
    #[test]
    fn echo_preserves_order_and_framing(
        batch in prop::collection::vec((any::<bool>(), ".{0,64}"), 1..20)
    ) {
        tokio_test::block_on(async {
            let (server_handle, addr) =
                spawn_test_server_with_handler(EchoHandler::new(), loopback())
                    .await
                    .map_err(|e| TestCaseError::fail(format!("Server setup failed: {}", e)))?;

            let mut client = WebSocketEchoClient::connect(&ws_url(addr)).await
                .map_err(|e| TestCaseError::fail(format!("Client connection failed: {}", e)))?;

            let sent: Vec<EchoMessage> = batch
                .iter()
                .map(|(is_binary, text)| {
                    if *is_binary {
                        EchoMessage::binary(text.clone().into_bytes())
                    } else {
                        EchoMessage::text(text.clone())
                    }
                })
                .collect();

            for message in &sent {
                client.send(message.clone()).await
                    .map_err(|e| TestCaseError::fail(format!("Send failed: {}", e)))?;
            }

            for expected in &sent {
                let received = client.receive().await
                    .map_err(|e| TestCaseError::fail(format!("Receive failed: {}", e)))?;
                prop_assert_eq!(&received, expected);
            }

            server_handle.abort();
            Ok(())
        })?;
    }
}
