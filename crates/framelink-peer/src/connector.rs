use crate::connection::{Connection, ConnectionConfig};
use crate::error::Result;

/// Resolve `addr` and open a framed connection with default settings.
///
/// Fails with [`framelink_transport::TransportError::Address`] when the address
/// does not resolve and [`framelink_transport::TransportError::Connect`] when
/// the connect itself fails.
pub fn dial(addr: &str) -> Result<Connection> {
    dial_with_config(addr, &ConnectionConfig::default())
}

/// Dial with explicit configuration.
pub fn dial_with_config(addr: &str, config: &ConnectionConfig) -> Result<Connection> {
    let stream = framelink_transport::connect(addr)?;
    Connection::from_stream(stream, config)
}
