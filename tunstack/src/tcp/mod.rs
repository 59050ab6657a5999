//! The TCP endpoint: byte streams in, byte streams out, segments on the
//! wire in between.

use std::net::SocketAddrV4;

pub mod cfg;
mod connection;
mod reassembler;
mod receiver;
pub mod seq;
mod sender;
mod stream;

pub use cfg::Config;
pub use connection::Connection;
pub use reassembler::Reassembler;
pub use receiver::Receiver;
pub use sender::Sender;
pub use stream::ByteStream;

#[cfg(test)]
mod tests;

/// The local/remote address pair a connection is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quad {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
}
