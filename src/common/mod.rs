//! Common traits and types used across the wsecho library
//!
//! This module contains the core traits that define the interface
//! for echo servers and clients, plus the reactor handle that
//! controls a server's lifetime.

pub mod reactor;
pub mod test_utils;
pub mod traits;

pub use reactor::Reactor;
pub use test_utils::{spawn_test_server, spawn_test_server_with_handler};
pub use traits::{EchoClient, EchoServerTrait};
