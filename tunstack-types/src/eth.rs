use crate::{iface::MacAddress, FromBytestream, IntoBytestream};
use bytestream::ByteOrder::BigEndian;
use bytestream::{StreamReader, StreamWriter};
use std::io::{Cursor, Read, Write};

pub const KIND_IPV4: u16 = 0x0800;
pub const KIND_ARP: u16 = 0x0806;

/// An Ethernet II frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub dest: MacAddress,
    pub src: MacAddress,
    pub ether_type: u16,
    pub content: Vec<u8>,
}

impl EthernetFrame {
    #[must_use]
    pub fn new(dest: MacAddress, src: MacAddress, ether_type: u16, content: Vec<u8>) -> Self {
        Self {
            dest,
            src,
            ether_type,
            content,
        }
    }
}

impl IntoBytestream for EthernetFrame {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        self.dest.into_bytestream(bytestream)?;
        self.src.into_bytestream(bytestream)?;
        self.ether_type.write_to(bytestream, BigEndian)?;
        bytestream.write_all(&self.content)?;
        Ok(())
    }
}

impl FromBytestream for EthernetFrame {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let dest = MacAddress::from_bytestream(bytestream)?;
        let src = MacAddress::from_bytestream(bytestream)?;
        let ether_type = u16::read_from(bytestream, BigEndian)?;

        let mut content = Vec::new();
        bytestream.read_to_end(&mut content)?;

        Ok(EthernetFrame {
            dest,
            src,
            ether_type,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let frame = EthernetFrame::new(
            MacAddress::BROADCAST,
            MacAddress::from([2, 4, 6, 8, 10, 12]),
            KIND_ARP,
            vec![0xaa, 0xbb],
        );
        let bytes = frame.to_vec().unwrap();
        assert_eq!(&bytes[..6], &[0xff; 6]);
        assert_eq!(&bytes[6..12], &[2, 4, 6, 8, 10, 12]);
        assert_eq!(&bytes[12..14], &[0x08, 0x06]);
        assert_eq!(&bytes[14..], &[0xaa, 0xbb]);

        assert_eq!(EthernetFrame::from_slice(&bytes).unwrap(), frame);
    }
}
