//! Core WebSocket infrastructure.
//!
//! This module provides generic connection management that can be
//! specialized for different WebSocket services using traits and the strategy pattern.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: one long-lived connection with buffering, reconnection and observer fan-out
//! - [`MessageParser`]: Trait for parsing incoming WebSocket messages
//! - [`Connector`]: Trait that opens a physical [`Transport`]; swap it for a fake in tests
//! - [`Observer`]: callback handle registered for messages or status changes
//!
//! # Example
//!
//! ```ignore
//! let connection = ConnectionManager::new(endpoint, Config::default(), parser, connector);
//! connection.add_status_observer(Observer::new(|state: &ConnectionState| println!("{state}")));
//! connection.connect().await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod observer;
pub mod traits;
#[cfg(feature = "ws")]
pub mod tungstenite;

pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use observer::Observer;
pub use traits::*;
#[cfg(feature = "ws")]
pub use tungstenite::TungsteniteConnector;
