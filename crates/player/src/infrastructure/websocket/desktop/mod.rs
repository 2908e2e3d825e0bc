//! Desktop WebSocket transport

mod transport;

pub use transport::TungsteniteTransport;
