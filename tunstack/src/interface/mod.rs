//! An Ethernet-like attachment point: encapsulates datagrams into
//! frames, resolving next-hop hardware addresses over ARP.

use crate::arp::{ArpConfig, ArpTable};
use std::{
    collections::VecDeque,
    io,
    net::Ipv4Addr,
    time::Duration,
};
use types::{
    arp::ArpPacket,
    eth::{EthernetFrame, KIND_ARP, KIND_IPV4},
    iface::MacAddress,
    ip::Ipv4Packet,
    FromBytestream, IntoBytestream,
};

/// One attachment of the stack to a link.
///
/// Outbound datagrams either leave immediately (cached neighbor) or are
/// parked until a broadcast ARP request resolves their next hop. Inbound
/// frames yield the carried datagram, feed the neighbor cache, or elicit
/// an ARP reply. All produced frames accumulate in
/// [`frames_out`](NetworkInterface::frames_out).
#[derive(Debug)]
pub struct NetworkInterface {
    mac: MacAddress,
    ip: Ipv4Addr,
    arp: ArpTable,
    frames_out: VecDeque<EthernetFrame>,
}

impl NetworkInterface {
    #[must_use]
    pub fn new(mac: MacAddress, ip: Ipv4Addr) -> Self {
        Self::new_with(mac, ip, ArpConfig::default())
    }

    #[must_use]
    pub fn new_with(mac: MacAddress, ip: Ipv4Addr, arp: ArpConfig) -> Self {
        tracing::info!(%mac, %ip, "interface up");
        Self {
            mac,
            ip,
            arp: ArpTable::new_with(arp),
            frames_out: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    #[must_use]
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// Sends `dgram` towards `next_hop`, resolving the hardware address
    /// first if necessary.
    ///
    /// # Errors
    ///
    /// Forwards serialization failures.
    pub fn send_datagram(&mut self, dgram: Ipv4Packet, next_hop: Ipv4Addr) -> io::Result<()> {
        if let Some(dest) = self.arp.lookup(next_hop) {
            let frame = EthernetFrame::new(dest, self.mac, KIND_IPV4, dgram.to_vec()?);
            self.frames_out.push_back(frame);
        } else if self.arp.wait_for(next_hop, dgram) {
            tracing::trace!(%next_hop, "broadcasting neighbor request");
            let request = ArpPacket::request(self.mac, self.ip, next_hop);
            self.frames_out.push_back(EthernetFrame::new(
                MacAddress::BROADCAST,
                self.mac,
                KIND_ARP,
                request.to_vec()?,
            ));
        }
        Ok(())
    }

    /// Accepts a frame from the link. A carried datagram is returned to
    /// the caller; ARP payloads are consumed internally. Frames for
    /// other hosts and malformed payloads are dropped.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) -> Option<Ipv4Packet> {
        if frame.dest != self.mac && !frame.dest.is_broadcast() {
            return None;
        }

        match frame.ether_type {
            KIND_IPV4 => match Ipv4Packet::from_slice(&frame.content) {
                Ok(dgram) => Some(dgram),
                Err(err) => {
                    tracing::warn!("dropping malformed datagram: {err}");
                    None
                }
            },
            KIND_ARP => {
                match ArpPacket::from_slice(&frame.content) {
                    Ok(arp) => self.recv_arp(&arp),
                    Err(err) => tracing::warn!("dropping malformed arp packet: {err}"),
                }
                None
            }
            ether_type => {
                tracing::trace!(ether_type, "ignoring frame of unknown type");
                None
            }
        }
    }

    fn recv_arp(&mut self, arp: &ArpPacket) {
        if !arp.src_paddr.is_unspecified() {
            let flushable = self.arp.update(arp.src_paddr, arp.src_haddr);
            for dgram in flushable {
                // resolves against the fresh cache entry
                if let Err(err) = self.send_datagram(dgram, arp.src_paddr) {
                    tracing::warn!("failed to flush parked datagram: {err}");
                }
            }
        }

        if arp.is_request() && arp.dest_paddr == self.ip {
            tracing::trace!(requester = %arp.src_paddr, "answering neighbor request");
            let reply = ArpPacket::response_to(arp, self.mac, self.ip);
            match reply.to_vec() {
                Ok(bytes) => self.frames_out.push_back(EthernetFrame::new(
                    arp.src_haddr,
                    self.mac,
                    KIND_ARP,
                    bytes,
                )),
                Err(err) => tracing::warn!("failed to encode arp reply: {err}"),
            }
        }
    }

    /// Advances the interface clock, expiring stale neighbor entries.
    pub fn tick(&mut self, delta: Duration) {
        self.arp.tick(delta);
    }

    /// Frames ready to be put on the link, oldest first.
    pub fn frames_out(&mut self) -> &mut VecDeque<EthernetFrame> {
        &mut self.frames_out
    }
}
