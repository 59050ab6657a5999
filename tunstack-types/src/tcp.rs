use crate::{
    ip::{Ipv4Flags, Ipv4Packet},
    util::checksum,
    FromBytestream, IntoBytestream,
};
use bytestream::ByteOrder::BigEndian;
use bytestream::{StreamReader, StreamWriter};
use std::{
    fmt::Display,
    io::{Cursor, Error, ErrorKind, Read, Write},
    net::Ipv4Addr,
};

pub const PROTO_TCP: u8 = 0x06;

/// A TCP segment assosciated with an end-to-end connection.
///
/// The checksum is not a field: it is computed over the IPv4 pseudo
/// header during [`TcpPacket::to_ipv4`] and discarded on parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpPacket {
    pub src_port: u16,
    pub dest_port: u16,
    pub seq_no: u32,
    pub ack_no: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub urgent_ptr: u16,

    pub content: Vec<u8>,
}

/// Flags of a [`TcpPacket`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct TcpFlags {
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

macro_rules! fimpl {
    ($i:ident) => {
        #[must_use]
        pub fn $i(mut self, value: bool) -> Self {
            self.$i = value;
            self
        }
    };
}

impl TcpPacket {
    /// A plain data-or-ack segment.
    #[must_use]
    pub fn new(
        src_port: u16,
        dest_port: u16,
        seq_no: u32,
        ack_no: u32,
        window: u16,
        content: Vec<u8>,
    ) -> TcpPacket {
        TcpPacket {
            src_port,
            dest_port,
            seq_no,
            ack_no,
            flags: TcpFlags::new().ack(true),
            window,
            urgent_ptr: 0,
            content,
        }
    }

    /// The initial segment of a handshake.
    #[must_use]
    pub fn syn(src_port: u16, dest_port: u16, seq_no: u32, window: u16) -> TcpPacket {
        TcpPacket {
            src_port,
            dest_port,
            seq_no,
            ack_no: 0,
            flags: TcpFlags::new().syn(true),
            window,
            urgent_ptr: 0,
            content: Vec::new(),
        }
    }

    #[must_use]
    pub fn rst_for_syn(syn: &TcpPacket) -> TcpPacket {
        TcpPacket {
            src_port: syn.dest_port,
            dest_port: syn.src_port,
            seq_no: 0,
            ack_no: syn.seq_no,
            flags: TcpFlags::new().ack(true).rst(true),
            window: 0,
            urgent_ptr: 0,
            content: Vec::new(),
        }
    }

    /// The number of sequence slots this segment occupies: one per
    /// payload byte plus one each for SYN and FIN.
    #[must_use]
    pub fn sequence_length(&self) -> usize {
        self.content.len() + usize::from(self.flags.syn) + usize::from(self.flags.fin)
    }

    /// Encapsulates the segment in an IPv4 datagram, filling in the
    /// checksum over the pseudo header, TCP header and payload.
    ///
    /// # Errors
    ///
    /// Forwards serialization failures.
    pub fn to_ipv4(&self, src: Ipv4Addr, dst: Ipv4Addr) -> Result<Ipv4Packet, Error> {
        let mut bytes = self.to_vec()?;

        let mut pseudo = [0u8; 12];
        pseudo[0..4].copy_from_slice(&src.octets());
        pseudo[4..8].copy_from_slice(&dst.octets());
        pseudo[9] = PROTO_TCP;
        pseudo[10..12].copy_from_slice(&(bytes.len() as u16).to_be_bytes());

        let chksum = checksum(&[&pseudo, &bytes]);
        bytes[16..18].copy_from_slice(&chksum.to_be_bytes());

        Ok(Ipv4Packet {
            dscp: 0,
            enc: 0,
            identification: 0,
            flags: Ipv4Flags {
                df: false,
                mf: false,
            },
            fragment_offset: 0,
            ttl: 64,
            proto: PROTO_TCP,
            src,
            dst,
            content: bytes,
        })
    }
}

impl TcpFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    fimpl!(urg);
    fimpl!(ack);
    fimpl!(psh);
    fimpl!(rst);
    fimpl!(syn);
    fimpl!(fin);
}

impl Display for TcpFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.urg {
            write!(f, "URG")?;
        }
        if self.ack {
            write!(f, "ACK")?;
        }
        if self.psh {
            write!(f, "PSH")?;
        }
        if self.rst {
            write!(f, "RST")?;
        }
        if self.syn {
            write!(f, "SYN")?;
        }
        if self.fin {
            write!(f, "FIN")?;
        }

        Ok(())
    }
}

impl IntoBytestream for TcpPacket {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        self.src_port.write_to(bytestream, BigEndian)?;
        self.dest_port.write_to(bytestream, BigEndian)?;

        self.seq_no.write_to(bytestream, BigEndian)?;
        self.ack_no.write_to(bytestream, BigEndian)?;

        // data offset 5, no options
        (5u8 << 4).write_to(bytestream, BigEndian)?;
        self.flags.into_bytestream(bytestream)?;
        self.window.write_to(bytestream, BigEndian)?;

        // checksum placeholder, see to_ipv4
        0u16.write_to(bytestream, BigEndian)?;
        self.urgent_ptr.write_to(bytestream, BigEndian)?;

        bytestream.write_all(&self.content)?;

        Ok(())
    }
}

impl IntoBytestream for TcpFlags {
    type Error = std::io::Error;
    fn into_bytestream(&self, bytestream: &mut impl Write) -> Result<(), Self::Error> {
        let mut byte = 0u8;
        if self.urg {
            byte |= 0b10_0000;
        }
        if self.ack {
            byte |= 0b01_0000;
        }
        if self.psh {
            byte |= 0b00_1000;
        }
        if self.rst {
            byte |= 0b00_0100;
        }
        if self.syn {
            byte |= 0b00_0010;
        }
        if self.fin {
            byte |= 0b00_0001;
        }

        byte.write_to(bytestream, BigEndian)
    }
}

impl FromBytestream for TcpPacket {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let src_port = u16::read_from(bytestream, BigEndian)?;
        let dest_port = u16::read_from(bytestream, BigEndian)?;

        let seq_no = u32::read_from(bytestream, BigEndian)?;
        let ack_no = u32::read_from(bytestream, BigEndian)?;

        let hlen = u8::read_from(bytestream, BigEndian)? >> 4;
        if hlen < 5 {
            return Err(Error::new(ErrorKind::InvalidData, "invalid data offset"));
        }
        let flags = TcpFlags::from_bytestream(bytestream)?;
        let window = u16::read_from(bytestream, BigEndian)?;

        let _checksum = u16::read_from(bytestream, BigEndian)?;
        let urgent_ptr = u16::read_from(bytestream, BigEndian)?;

        // options are not supported, skip them
        for _ in 20..usize::from(hlen) * 4 {
            u8::read_from(bytestream, BigEndian)?;
        }

        let mut content = Vec::new();
        bytestream.read_to_end(&mut content)?;

        Ok(TcpPacket {
            src_port,
            dest_port,
            seq_no,
            ack_no,
            flags,
            window,
            urgent_ptr,
            content,
        })
    }
}

impl FromBytestream for TcpFlags {
    type Error = std::io::Error;
    fn from_bytestream(bytestream: &mut Cursor<impl AsRef<[u8]>>) -> Result<Self, Self::Error> {
        let byte = u8::read_from(bytestream, BigEndian)?;

        Ok(TcpFlags {
            urg: byte & 0b10_0000 != 0,
            ack: byte & 0b01_0000 != 0,
            psh: byte & 0b00_1000 != 0,
            rst: byte & 0b00_0100 != 0,
            syn: byte & 0b00_0010 != 0,
            fin: byte & 0b00_0001 != 0,
        })
    }
}
