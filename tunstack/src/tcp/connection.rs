use super::{cfg::Config, receiver::Receiver, sender::Sender, stream::ByteStream, Quad};
use std::{collections::VecDeque, time::Duration};
use types::tcp::TcpPacket;

/// A full TCP endpoint: one [`Sender`], one [`Receiver`] and the
/// lifecycle glue between them.
///
/// The connection is driven from outside through three entry points:
/// [`segment_received`](Connection::segment_received) for every parsed
/// inbound segment, [`tick`](Connection::tick) for the passage of time,
/// and the local I/O calls ([`write`](Connection::write),
/// [`end_input_stream`](Connection::end_input_stream),
/// [`connect`](Connection::connect)). Each call leaves any outbound
/// segments in [`segments_out`](Connection::segments_out), stamped with
/// the current acknowledgment and window.
#[derive(Debug)]
pub struct Connection {
    sender: Sender,
    receiver: Receiver,
    cfg: Config,

    segments_out: VecDeque<TcpPacket>,
    time_since_recv: Duration,
    linger: bool,
    active: bool,
}

impl Connection {
    #[must_use]
    pub fn new(quad: Quad, cfg: Config) -> Self {
        Self {
            sender: Sender::new(quad, &cfg),
            receiver: Receiver::new(cfg.recv_buffer_cap),
            segments_out: VecDeque::new(),
            time_since_recv: Duration::ZERO,
            linger: cfg.linger_after_streams_finish,
            active: true,
            cfg,
        }
    }

    /// Opens the connection by emitting the SYN.
    pub fn connect(&mut self) {
        if !self.active {
            return;
        }
        self.sender.fill_window();
        self.drain();
    }

    pub fn segment_received(&mut self, seg: &TcpPacket) {
        if !self.active {
            return;
        }
        self.time_since_recv = Duration::ZERO;

        if seg.flags.rst {
            tracing::info!("connection reset by peer");
            self.shutdown(false);
            return;
        }

        self.receiver.segment_received(seg);

        if seg.flags.ack {
            self.sender.ack_received(seg.ack_no, seg.window);
        }

        // every segment that occupies sequence space must be answered;
        // fill_window covers the SYN-ACK of a passive open
        if seg.sequence_length() > 0 && self.sender.segments_out_mut().is_empty() {
            self.sender.fill_window();
            if self.sender.segments_out_mut().is_empty() {
                self.sender.send_empty_segment(false, false, false);
            }
        }

        // a keep-alive probe sits one slot below the ackno and is empty
        if let Some(ackno) = self.receiver.ackno() {
            if seg.sequence_length() == 0 && seg.seq_no == ackno.wrapping_sub(1) {
                self.sender.send_empty_segment(false, false, false);
            }
        }

        self.drain();

        // the remote stream ended before ours: the peer sees our FIN ack
        // arrive reliably, no need to linger afterwards
        if self.receiver.stream_out().input_ended() && !self.sender.stream_in().input_ended() {
            self.linger = false;
        }
    }

    /// Feeds time to the retransmission machinery and settles the
    /// shutdown decision.
    pub fn tick(&mut self, delta: Duration) {
        if !self.active {
            return;
        }
        self.time_since_recv += delta;

        if self.sender.consecutive_retransmissions() >= self.cfg.max_retx {
            tracing::info!("retransmission limit reached, resetting connection");
            self.send_rst();
            self.shutdown(false);
            return;
        }

        self.sender.tick(delta);

        if self.streams_finished() {
            if !self.linger || self.time_since_recv >= 10 * self.cfg.rto_initial {
                self.shutdown(true);
            }
        }

        self.drain();
    }

    /// Accepts outbound data, sends whatever the window admits.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if !self.active {
            return 0;
        }
        let written = self.sender.stream_in_mut().write(data);
        self.sender.fill_window();
        self.drain();
        written
    }

    /// Closes the outbound stream; the FIN follows the remaining data.
    pub fn end_input_stream(&mut self) {
        if !self.active {
            return;
        }
        self.sender.stream_in_mut().end_input();
        self.sender.fill_window();
        self.drain();
    }

    /// Aborts: tells the peer via RST and errors both streams.
    pub fn abort(&mut self) {
        if !self.active {
            return;
        }
        self.send_rst();
        self.shutdown(false);
    }

    /// Moves the sender's segments into the outbound queue, stamping the
    /// receiver's acknowledgment and window onto each. This is the only
    /// place receiver state reaches the wire.
    fn drain(&mut self) {
        let ackno = self.receiver.ackno();
        let window = self.receiver.window_size().min(usize::from(u16::MAX)) as u16;

        while let Some(mut seg) = self.sender.segments_out_mut().pop_front() {
            seg.window = window;
            if let Some(ackno) = ackno {
                seg.flags.ack = true;
                seg.ack_no = ackno;
            }
            self.segments_out.push_back(seg);
        }
    }

    fn send_rst(&mut self) {
        self.sender.send_empty_segment(false, false, true);
        self.drain();
    }

    fn shutdown(&mut self, clean: bool) {
        if !clean {
            self.sender.stream_in_mut().set_error();
            self.receiver.stream_out_mut().set_error();
        }
        self.active = false;
    }

    /// Both directions are complete: the inbound stream has ended with
    /// nothing left to assemble, and our SYN, all data and the FIN have
    /// been sent and fully acknowledged.
    fn streams_finished(&self) -> bool {
        self.receiver.stream_out().input_ended()
            && self.receiver.unassembled_bytes() == 0
            && self.sender.stream_in().input_ended()
            && self.sender.bytes_in_flight() == 0
            && self.sender.next_seq_no_abs() == self.sender.stream_in().bytes_written() + 2
    }

    /// Whether the endpoint still participates in the connection. Once
    /// false, no further segments will be produced.
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn segments_out(&mut self) -> &mut VecDeque<TcpPacket> {
        &mut self.segments_out
    }

    /// The stream of bytes received from the peer.
    pub fn inbound_stream(&mut self) -> &mut ByteStream {
        self.receiver.stream_out_mut()
    }

    #[must_use]
    pub fn remaining_outbound_capacity(&self) -> usize {
        self.sender.stream_in().remaining_capacity()
    }

    #[must_use]
    pub fn bytes_in_flight(&self) -> u64 {
        self.sender.bytes_in_flight()
    }

    #[must_use]
    pub fn unassembled_bytes(&self) -> usize {
        self.receiver.unassembled_bytes()
    }

    #[must_use]
    pub fn time_since_last_segment_received(&self) -> Duration {
        self.time_since_recv
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.active {
            tracing::warn!("unclean teardown of an active connection");
            self.abort();
        }
    }
}
