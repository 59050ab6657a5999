//! Longest-prefix-match forwarding between [`NetworkInterface`]s.

use crate::interface::NetworkInterface;
use std::{io, net::Ipv4Addr};
use types::{eth::EthernetFrame, ip::Ipv4Packet};

/// One forwarding entry: datagrams matching `prefix/prefix_len` leave
/// through interface `iface`, handed to `next_hop` (or, on a directly
/// attached network, to their final destination).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: Ipv4Addr,
    pub prefix_len: u8,
    pub next_hop: Option<Ipv4Addr>,
    pub iface: usize,
}

/// A small IPv4 router over a set of owned interfaces.
#[derive(Debug, Default)]
pub struct Router {
    interfaces: Vec<NetworkInterface>,
    // sorted by prefix length, so a reverse scan finds the longest match
    rules: Vec<RouteRule>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an interface and returns its index.
    pub fn add_interface(&mut self, iface: NetworkInterface) -> usize {
        self.interfaces.push(iface);
        self.interfaces.len() - 1
    }

    #[must_use]
    pub fn interface(&self, idx: usize) -> &NetworkInterface {
        &self.interfaces[idx]
    }

    pub fn interface_mut(&mut self, idx: usize) -> &mut NetworkInterface {
        &mut self.interfaces[idx]
    }

    /// Registers a forwarding rule.
    pub fn add_route(
        &mut self,
        prefix: Ipv4Addr,
        prefix_len: u8,
        next_hop: Option<Ipv4Addr>,
        iface: usize,
    ) {
        assert!(prefix_len <= 32, "prefix length exceeds address width");
        assert!(iface < self.interfaces.len(), "no such interface");

        tracing::info!(%prefix, prefix_len, ?next_hop, iface, "adding route");
        let rule = RouteRule {
            prefix,
            prefix_len,
            next_hop,
            iface,
        };
        match self
            .rules
            .binary_search_by_key(&prefix_len, |r| r.prefix_len)
        {
            Ok(i) | Err(i) => self.rules.insert(i, rule),
        }
    }

    /// Forwards one datagram: picks the most specific matching rule,
    /// spends one TTL hop and hands the datagram to that rule's
    /// interface. Expired and unroutable datagrams are dropped.
    ///
    /// # Errors
    ///
    /// Forwards serialization failures from the interface.
    pub fn route_one(&mut self, mut dgram: Ipv4Packet) -> io::Result<()> {
        if dgram.ttl <= 1 {
            tracing::trace!(dst = %dgram.dst, "dropping datagram, ttl exceeded");
            return Ok(());
        }

        let Some(rule) = self.lookup(dgram.dst) else {
            tracing::trace!(dst = %dgram.dst, "dropping datagram, no route");
            return Ok(());
        };
        let (next_hop, iface) = (rule.next_hop, rule.iface);

        dgram.ttl -= 1;
        let next_hop = next_hop.unwrap_or(dgram.dst);
        self.interfaces[iface].send_datagram(dgram, next_hop)
    }

    /// Receives a frame on interface `iface` and forwards any datagram
    /// it carried.
    ///
    /// # Errors
    ///
    /// Forwards serialization failures from the interface.
    pub fn recv_frame(&mut self, iface: usize, frame: &EthernetFrame) -> io::Result<()> {
        match self.interfaces[iface].recv_frame(frame) {
            Some(dgram) => self.route_one(dgram),
            None => Ok(()),
        }
    }

    fn lookup(&self, dst: Ipv4Addr) -> Option<&RouteRule> {
        self.rules.iter().rev().find(|rule| {
            let mask = prefix_mask(rule.prefix_len);
            u32::from(dst) & mask == u32::from(rule.prefix) & mask
        })
    }
}

fn prefix_mask(len: u8) -> u32 {
    if len == 0 {
        0
    } else {
        u32::MAX << (32 - len)
    }
}
