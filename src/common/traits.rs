use crate::Result;
use crate::common::Reactor;
use async_trait::async_trait;

/// Common trait for echo servers
///
/// This trait defines the interface every echo server exposes:
/// a way to run it and the reactor handle that stops it.
#[async_trait]
pub trait EchoServerTrait {
    /// Starts the echo server and serves connections until the reactor stops
    async fn run(&self) -> Result<()>;

    /// Returns the reactor handle that can be used to stop the server
    fn reactor(&self) -> Reactor;
}

/// Common trait for echo clients
///
/// This trait defines the common interface that echo clients
/// must implement.
#[async_trait]
pub trait EchoClient {
    /// Sends data to the echo server and returns the echoed response
    async fn echo(&mut self, data: &[u8]) -> Result<Vec<u8>>;

    /// Sends a string and returns the echoed string
    async fn echo_string(&mut self, data: &str) -> Result<String> {
        let response = self.echo(data.as_bytes()).await?;
        Ok(std::str::from_utf8(&response)?.to_owned())
    }
}
