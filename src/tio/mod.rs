//! Tio container protocol client
//!
//! Speaks the server's text protocol over TCP to read back container state
//! after a benchmark run.

pub mod client;
pub mod codec;
pub mod naming;

pub use client::{
    ContainerHandle, ContainerStore, Connector, TioAddress, TioConnection, TioConnector,
};
pub use naming::SymbolContainer;
