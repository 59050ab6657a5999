//! A user-space TCP/IPv4 endpoint for point-to-point tunnel links.
//!
//! The crate is split into a byte-stream-oriented TCP core ([`tcp`]) and a
//! small network plane: ARP-backed neighbor resolution on an Ethernet-like
//! link ([`interface`]) and longest-prefix-match forwarding ([`routing`]).
//! All components are clock-free: time only advances through explicit
//! `tick` calls, and every outbound unit is buffered in a queue that the
//! driving event loop drains.

pub mod arp;
pub mod interface;
pub mod routing;
pub mod tcp;

pub use types;
