use crate::connection::Connection;

/// Application code that takes ownership of each accepted connection.
///
/// `accept` runs on its own thread, once per connection, in no particular
/// order relative to other calls. The handler owns the connection from then
/// on and is responsible for closing it.
pub trait Handler: Send + Sync + 'static {
    fn accept(&self, connection: Connection);
}

impl<F> Handler for F
where
    F: Fn(Connection) + Send + Sync + 'static,
{
    fn accept(&self, connection: Connection) {
        self(connection)
    }
}
