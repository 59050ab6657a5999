use crate::tcp::{Config, Connection, Quad};
use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};
use types::tcp::TcpPacket;

pub(super) const WIN: u16 = 4096;
pub(super) const RTO: Duration = Duration::from_millis(1000);

pub(super) const CLIENT_ISS: u32 = 2000;
pub(super) const SERVER_ISS: u32 = 8000;

/// One endpoint under test, with helpers to shove segments around.
pub(super) struct TcpTestUnit {
    pub(super) con: Connection,
}

impl TcpTestUnit {
    pub fn new(src: SocketAddrV4, dst: SocketAddrV4, iss: u32) -> Self {
        let cfg = Config {
            send_buffer_cap: WIN as usize,
            recv_buffer_cap: WIN as usize,
            rto_initial: RTO,
            iss: Some(iss),
            ..Default::default()
        };
        Self {
            con: Connection::new(Quad { src, dst }, cfg),
        }
    }

    pub fn client() -> Self {
        Self::new(
            SocketAddrV4::new(Ipv4Addr::new(10, 0, 1, 104), 80),
            SocketAddrV4::new(Ipv4Addr::new(20, 0, 2, 204), 1808),
            CLIENT_ISS,
        )
    }

    pub fn server() -> Self {
        Self::new(
            SocketAddrV4::new(Ipv4Addr::new(20, 0, 2, 204), 1808),
            SocketAddrV4::new(Ipv4Addr::new(10, 0, 1, 104), 80),
            SERVER_ISS,
        )
    }

    pub fn incoming(&mut self, pkt: TcpPacket) {
        self.con.segment_received(&pkt);
    }

    pub fn tick(&mut self, delta: Duration) {
        self.con.tick(delta);
    }

    /// Forwards `n` queued segments to `peer`.
    pub fn pipe(&mut self, peer: &mut Self, n: usize) {
        let pkts: Vec<_> = self.con.segments_out().drain(..n).collect();
        for pkt in pkts {
            peer.incoming(pkt);
        }
    }

    pub fn assert_outgoing(&mut self, f: impl FnOnce(Vec<TcpPacket>)) {
        f(self.con.segments_out().drain(..).collect());
    }

    pub fn assert_outgoing_eq(&mut self, pkts: &[TcpPacket]) {
        self.assert_outgoing(|outgoing| {
            assert_eq!(outgoing, pkts);
        });
    }

    pub fn clear_outgoing(&mut self) {
        self.con.segments_out().clear();
    }

    /// Runs the three-segment opening exchange between two fresh units.
    pub fn handshake_pipe(&mut self, server: &mut Self) {
        self.con.connect();
        self.pipe(server, 1);
        server.pipe(self, 1);
        self.pipe(server, 1);

        assert!(self.con.active());
        assert!(server.con.active());
        self.assert_outgoing_eq(&[]);
        server.assert_outgoing_eq(&[]);
    }
}
