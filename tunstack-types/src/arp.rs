use crate::{iface::MacAddress, ip::ipv4_from_bytestream, FromBytestream, IntoBytestream};
use bytestream::ByteOrder::BigEndian;
use bytestream::{StreamReader, StreamWriter};
use std::{
    io::{Cursor, Error, ErrorKind, Write},
    net::Ipv4Addr,
};

/// An ARP packet for IPv4 over Ethernet (htype 1, ptype 0x0800).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArpPacket {
    pub htype: u16,
    pub ptype: u16,
    pub operation: ArpOperation,
    pub src_haddr: MacAddress,
    pub src_paddr: Ipv4Addr,
    pub dest_haddr: MacAddress,
    pub dest_paddr: Ipv4Addr,
}

primitve_enum_repr! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum ArpOperation {
        type Repr = u16;

        Request = 1,
        Response = 2,
    };
}

impl ArpPacket {
    /// A request for the hardware address of `target`, broadcast from
    /// the interface described by (`src_haddr`, `src_paddr`).
    #[must_use]
    pub fn request(src_haddr: MacAddress, src_paddr: Ipv4Addr, target: Ipv4Addr) -> Self {
        ArpPacket {
            htype: 1,
            ptype: 0x0800,
            operation: ArpOperation::Request,
            src_haddr,
            src_paddr,
            dest_haddr: MacAddress::NULL,
            dest_paddr: target,
        }
    }

    /// The response to `request`, answered by (`haddr`, `paddr`).
    #[must_use]
    pub fn response_to(request: &ArpPacket, haddr: MacAddress, paddr: Ipv4Addr) -> Self {
        ArpPacket {
            htype: 1,
            ptype: 0x0800,
            operation: ArpOperation::Response,
            src_haddr: haddr,
            src_paddr: paddr,
            dest_haddr: request.src_haddr,
            dest_paddr: request.src_paddr,
        }
    }

    #[must_use]
    pub fn is_request(&self) -> bool {
        self.operation == ArpOperation::Request
    }
}

impl IntoBytestream for ArpPacket {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        self.htype.write_to(bytestream, BigEndian)?;
        self.ptype.write_to(bytestream, BigEndian)?;

        // haddr_size
        6u8.write_to(bytestream, BigEndian)?;
        // paddr_size
        4u8.write_to(bytestream, BigEndian)?;

        self.operation.into_bytestream(bytestream)?;

        self.src_haddr.into_bytestream(bytestream)?;
        bytestream.write_all(&self.src_paddr.octets())?;

        self.dest_haddr.into_bytestream(bytestream)?;
        bytestream.write_all(&self.dest_paddr.octets())?;

        Ok(())
    }
}

impl IntoBytestream for ArpOperation {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        self.to_raw().write_to(bytestream, BigEndian)
    }
}

impl FromBytestream for ArpPacket {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let htype = u16::read_from(bytestream, BigEndian)?;
        let ptype = u16::read_from(bytestream, BigEndian)?;

        let hlen = u8::read_from(bytestream, BigEndian)?;
        let plen = u8::read_from(bytestream, BigEndian)?;
        if hlen != 6 || plen != 4 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "expected ethernet/ipv4 address sizes",
            ));
        }

        let operation = ArpOperation::from_bytestream(bytestream)?;
        let src_haddr = MacAddress::from_bytestream(bytestream)?;
        let src_paddr = ipv4_from_bytestream(bytestream)?;
        let dest_haddr = MacAddress::from_bytestream(bytestream)?;
        let dest_paddr = ipv4_from_bytestream(bytestream)?;

        Ok(ArpPacket {
            htype,
            ptype,
            operation,
            src_haddr,
            src_paddr,
            dest_haddr,
            dest_paddr,
        })
    }
}

impl FromBytestream for ArpOperation {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let tag = u16::read_from(bytestream, BigEndian)?;
        Self::from_raw(tag).ok_or_else(|| Error::new(ErrorKind::InvalidData, "invalid arp opcode"))
    }
}
