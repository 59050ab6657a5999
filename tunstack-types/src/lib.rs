#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

use std::io::{Cursor, Write};

#[macro_use]
mod macros;

pub mod arp;
pub mod eth;
pub mod iface;
pub mod ip;
pub mod tcp;
pub mod util;

/// Serialization into a big-endian byte stream.
pub trait IntoBytestream {
    type Error;

    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error>;

    fn to_vec(&self) -> Result<Vec<u8>, Self::Error> {
        let mut buffer = Vec::new();
        self.into_bytestream(&mut buffer)?;
        Ok(buffer)
    }
}

/// Deserialization from a big-endian byte stream.
pub trait FromBytestream: Sized {
    type Error;

    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error>;

    fn from_slice(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytestream(&mut Cursor::new(slice))
    }
}
