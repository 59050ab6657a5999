use super::{reassembler::Reassembler, seq, stream::ByteStream};
use types::tcp::TcpPacket;

/// The receive half of a connection.
///
/// Consumes inbound segments, maps their sequence numbers into the
/// stream domain and feeds the payload to a [`Reassembler`]. Publishes
/// the cumulative acknowledgment and the advertised window.
#[derive(Debug)]
pub struct Receiver {
    reassembler: Reassembler,
    isn: Option<u32>,
    fin_seen: bool,
}

impl Receiver {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            reassembler: Reassembler::new(capacity),
            isn: None,
            fin_seen: false,
        }
    }

    pub fn segment_received(&mut self, seg: &TcpPacket) {
        let syn = seg.flags.syn;

        let isn = match self.isn {
            Some(isn) => isn,
            None if syn => {
                tracing::trace!(isn = seg.seq_no, "stream opened");
                self.isn = Some(seg.seq_no);
                seg.seq_no
            }
            // nothing to synchronize against yet
            None => return,
        };

        if !seg.content.is_empty() && (syn || seg.seq_no != isn) {
            // In the wire domain the SYN sits one slot before byte zero,
            // so the first payload byte of a non-SYN segment lives at
            // seq_no - 1 relative to the stream.
            let wire_index = if syn {
                seg.seq_no
            } else {
                seg.seq_no.wrapping_sub(1)
            };
            let index = seq::unwrap(wire_index, isn, self.reassembler.wait_index());
            self.reassembler.push(&seg.content, index, seg.flags.fin);
        }

        if seg.flags.fin || self.fin_seen {
            self.fin_seen = true;
            if self.reassembler.unassembled_bytes() == 0 {
                self.reassembler.stream_out_mut().end_input();
            }
        }
    }

    /// The next sequence number expected from the peer, once a SYN has
    /// arrived. The FIN slot is acknowledged only after the stream has
    /// actually closed, i.e. not while assembled bytes are still missing.
    #[must_use]
    pub fn ackno(&self) -> Option<u32> {
        let isn = self.isn?;
        let mut index = self.reassembler.wait_index() + 1;
        if self.reassembler.stream_out().input_ended() {
            index += 1;
        }
        Some(seq::wrap(index, isn))
    }

    /// Free space in the assembly buffer, advertised to the peer.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.reassembler.stream_out().remaining_capacity()
    }

    #[must_use]
    pub fn unassembled_bytes(&self) -> usize {
        self.reassembler.unassembled_bytes()
    }

    #[must_use]
    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.stream_out()
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.stream_out_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::tcp::TcpFlags;

    const ISN: u32 = 4000;

    fn seg(seq_no: u32, content: &[u8]) -> TcpPacket {
        TcpPacket {
            src_port: 1808,
            dest_port: 80,
            seq_no,
            ack_no: 0,
            flags: TcpFlags::new(),
            window: 1024,
            urgent_ptr: 0,
            content: content.to_vec(),
        }
    }

    fn syn(seq_no: u32) -> TcpPacket {
        let mut s = seg(seq_no, b"");
        s.flags.syn = true;
        s
    }

    #[test]
    fn segments_before_syn_are_dropped() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&seg(ISN + 1, b"early"));
        assert_eq!(recv.ackno(), None);
        assert!(recv.stream_out().is_empty());
    }

    #[test]
    fn syn_sets_the_ack_base() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));
        assert_eq!(recv.ackno(), Some(ISN + 1));
        assert_eq!(recv.window_size(), 64);
    }

    #[test]
    fn payload_advances_ackno_and_shrinks_window() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));
        recv.segment_received(&seg(ISN + 1, b"hello"));
        assert_eq!(recv.ackno(), Some(ISN + 6));
        assert_eq!(recv.window_size(), 59);
        assert_eq!(recv.stream_out_mut().read(16), b"hello");
    }

    #[test]
    fn data_on_the_syn_slot_is_discarded() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));
        // a non-SYN segment whose seqno still equals the ISN carries
        // nothing the stream could use
        recv.segment_received(&seg(ISN, b"bogus"));
        assert_eq!(recv.ackno(), Some(ISN + 1));
        assert!(recv.stream_out().is_empty());
    }

    #[test]
    fn syn_with_payload_assembles_from_byte_zero() {
        let mut recv = Receiver::new(64);
        let mut first = syn(ISN);
        first.content = b"hi".to_vec();
        recv.segment_received(&first);
        assert_eq!(recv.ackno(), Some(ISN + 3));
        assert_eq!(recv.stream_out_mut().read(4), b"hi");
    }

    #[test]
    fn fin_is_acknowledged_only_after_the_gap_closes() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));

        let mut tail = seg(ISN + 3, b"cd");
        tail.flags.fin = true;
        recv.segment_received(&tail);
        // "ab" is still missing, neither data nor FIN may be acked
        assert_eq!(recv.ackno(), Some(ISN + 1));
        assert!(!recv.stream_out().input_ended());

        recv.segment_received(&seg(ISN + 1, b"ab"));
        assert_eq!(recv.ackno(), Some(ISN + 6));
        assert!(recv.stream_out().input_ended());
        assert_eq!(recv.stream_out_mut().read(8), b"abcd");
    }

    #[test]
    fn empty_fin_closes_immediately() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));
        recv.segment_received(&seg(ISN + 1, b"ab"));

        let mut fin = seg(ISN + 3, b"");
        fin.flags.fin = true;
        recv.segment_received(&fin);
        assert!(recv.stream_out().input_ended());
        assert_eq!(recv.ackno(), Some(ISN + 4));
    }

    #[test]
    fn out_of_order_delivery_reassembles() {
        let mut recv = Receiver::new(64);
        recv.segment_received(&syn(ISN));
        recv.segment_received(&seg(ISN + 4, b"def"));
        assert_eq!(recv.ackno(), Some(ISN + 1));
        assert_eq!(recv.unassembled_bytes(), 3);

        recv.segment_received(&seg(ISN + 1, b"abc"));
        assert_eq!(recv.ackno(), Some(ISN + 7));
        assert_eq!(recv.stream_out_mut().read(8), b"abcdef");
    }
}
