use crate::{util::checksum, FromBytestream, IntoBytestream};
use bytestream::ByteOrder::BigEndian;
use bytestream::{StreamReader, StreamWriter};
use std::{
    io::{Cursor, Error, ErrorKind, Read, Write},
    net::Ipv4Addr,
};

/// An IPv4 datagram. The header checksum is computed on serialization
/// and is not retained as a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv4Packet {
    pub dscp: u8,
    pub enc: u8,
    pub identification: u16,
    pub flags: Ipv4Flags,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub proto: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,

    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Flags {
    pub df: bool,
    pub mf: bool,
}

impl Ipv4Flags {
    fn as_u16(self) -> u16 {
        let pat = if self.df { 0b010u16 } else { 0u16 } | if self.mf { 0b100u16 } else { 0u16 };
        pat << 13u16
    }
}

impl IntoBytestream for Ipv4Packet {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        let mut header = Vec::with_capacity(20);

        header.write_all(&[0b0100_0101, (self.dscp << 2) | self.enc])?;

        let len = 20 + self.content.len() as u16;
        len.write_to(&mut header, BigEndian)?;
        self.identification.write_to(&mut header, BigEndian)?;

        let fword = self.flags.as_u16() | self.fragment_offset;
        fword.write_to(&mut header, BigEndian)?;

        header.write_all(&[self.ttl, self.proto])?;
        // checksum, patched below
        header.write_all(&[0, 0])?;

        header.write_all(&self.src.octets().as_slice())?;
        header.write_all(&self.dst.octets().as_slice())?;

        let chksum = checksum(&[&header]);
        header[10..12].copy_from_slice(&chksum.to_be_bytes());

        bytestream.write_all(&header)?;
        bytestream.write_all(&self.content)?;
        Ok(())
    }
}

impl FromBytestream for Ipv4Packet {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let byte0 = u8::read_from(bytestream, BigEndian)?;
        let version = byte0 >> 4;
        if version != 4 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Ipv4 version flag expected, got other value",
            ));
        }
        let ihl = byte0 & 0x0f;
        if ihl < 5 {
            return Err(Error::new(ErrorKind::InvalidData, "invalid header length"));
        }

        let byte1 = u8::read_from(bytestream, BigEndian)?;
        let dscp = byte1 >> 2;
        let enc = byte1 & 0x03;

        let len = u16::read_from(bytestream, BigEndian)?;
        let identification = u16::read_from(bytestream, BigEndian)?;

        let fword = u16::read_from(bytestream, BigEndian)?;
        let flags = Ipv4Flags {
            mf: fword & (0b100 << 13) != 0,
            df: fword & (0b010 << 13) != 0,
        };
        let fragment_offset = fword & 0x1fff;

        let ttl = u8::read_from(bytestream, BigEndian)?;
        let proto = u8::read_from(bytestream, BigEndian)?;

        let _checksum = u16::read_from(bytestream, BigEndian)?;

        let src = ipv4_from_bytestream(bytestream)?;
        let dst = ipv4_from_bytestream(bytestream)?;

        // skip any options
        let header_len = usize::from(ihl) * 4;
        for _ in 20..header_len {
            u8::read_from(bytestream, BigEndian)?;
        }

        let content_len = (usize::from(len))
            .checked_sub(header_len)
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "total length below header length"))?;
        let mut content = vec![0; content_len];
        bytestream.read_exact(&mut content)?;

        Ok(Self {
            dscp,
            enc,
            identification,
            flags,
            fragment_offset,
            ttl,
            proto,
            src,
            dst,
            content,
        })
    }
}

pub(crate) fn ipv4_from_bytestream(
    bytestream: &mut Cursor<impl AsRef<[u8]>>,
) -> Result<Ipv4Addr, std::io::Error> {
    Ok(Ipv4Addr::from(u32::read_from(bytestream, BigEndian)?))
}
