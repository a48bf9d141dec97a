mod connection;
mod keepalive;

pub use connection::handle_connection;
pub use keepalive::KeepAlive;
