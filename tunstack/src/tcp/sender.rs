use super::{cfg::Config, seq, stream::ByteStream, Quad};
use std::{collections::VecDeque, time::Duration};
use types::tcp::{TcpFlags, TcpPacket};

/// Retransmission timer. Pure data: it never consults a clock and only
/// moves when [`update`](RetransmitTimer::update) feeds it elapsed time.
#[derive(Debug, Default)]
struct RetransmitTimer {
    active: bool,
    expired: bool,
    elapsed: Duration,
    timeout: Duration,
}

impl RetransmitTimer {
    fn start(&mut self, timeout: Duration) {
        self.active = true;
        self.expired = false;
        self.elapsed = Duration::ZERO;
        self.timeout = timeout;
    }

    fn update(&mut self, delta: Duration) {
        assert!(
            self.active,
            "cannot advance an inactive retransmission timer"
        );
        self.elapsed += delta;
        if self.elapsed >= self.timeout {
            self.expired = true;
        }
    }

    fn stop(&mut self) {
        *self = Self::default();
    }

    fn active(&self) -> bool {
        self.active
    }

    fn expired(&self) -> bool {
        self.active && self.expired
    }
}

/// The send half of a connection.
///
/// Chunks the outbound byte stream into segments honoring the peer's
/// advertised window, keeps every unacknowledged segment for possible
/// retransmission and backs the timeout off exponentially while real
/// losses accumulate.
#[derive(Debug)]
pub struct Sender {
    quad: Quad,
    isn: u32,

    stream: ByteStream,
    segments_out: VecDeque<TcpPacket>,
    outstanding: VecDeque<TcpPacket>,

    rto_initial: Duration,
    rto: Duration,
    consecutive_retx: u32,
    timer: RetransmitTimer,

    next_seq_no: u64,
    peer_window: u16,
    mss: u16,
    syn_sent: bool,
    fin_sent: bool,
}

impl Sender {
    #[must_use]
    pub fn new(quad: Quad, cfg: &Config) -> Self {
        Self {
            quad,
            isn: cfg.initial_seq_no(),
            stream: ByteStream::new(cfg.send_buffer_cap),
            segments_out: VecDeque::new(),
            outstanding: VecDeque::new(),
            rto_initial: cfg.rto_initial,
            rto: cfg.rto_initial,
            consecutive_retx: 0,
            timer: RetransmitTimer::default(),
            next_seq_no: 0,
            // assume a window of one until the peer tells us otherwise,
            // so the very first segment can leave
            peer_window: 1,
            mss: cfg.mss,
            syn_sent: false,
            fin_sent: false,
        }
    }

    /// Emits as many segments as the peer's window allows: SYN first,
    /// then stream data in MSS-sized chunks, finally FIN once the stream
    /// is exhausted and a sequence slot is left.
    pub fn fill_window(&mut self) {
        // a zero window is probed with single bytes
        let window = u64::from(self.peer_window.max(1));
        let mut free = window.saturating_sub(self.bytes_in_flight());

        while free > 0 {
            let mut seg = self.blank_segment();

            if !self.syn_sent {
                seg.flags.syn = true;
                self.syn_sent = true;
                free -= 1;
            }

            seg.content = self.stream.read((free as usize).min(self.mss.into()));
            free -= seg.content.len() as u64;

            if !self.fin_sent && self.stream.eof() && free > 0 {
                seg.flags.fin = true;
                self.fin_sent = true;
                free -= 1;
            }

            let len = seg.sequence_length();
            if len == 0 {
                break;
            }

            self.next_seq_no += len as u64;
            if !self.timer.active() {
                self.timer.start(self.rto);
            }
            self.outstanding.push_back(seg.clone());
            self.segments_out.push_back(seg);
        }
    }

    /// Processes a cumulative acknowledgment and window update.
    pub fn ack_received(&mut self, ack_no: u32, window: u16) {
        self.peer_window = window;

        let ack_abs = seq::unwrap(ack_no, self.isn, self.next_seq_no);
        if ack_abs > self.next_seq_no {
            tracing::trace!(ack_abs, "ignoring ack of unsent data");
            return;
        }

        while let Some(seg) = self.outstanding.front() {
            let seg_end = seq::unwrap(seg.seq_no, self.isn, self.next_seq_no)
                + seg.sequence_length() as u64;
            if seg_end > ack_abs {
                break;
            }
            self.outstanding.pop_front();
            self.rto = self.rto_initial;
            self.timer.start(self.rto);
            self.consecutive_retx = 0;
        }
        if self.outstanding.is_empty() {
            self.timer.stop();
        }

        // the window may just have opened up
        self.fill_window();
    }

    /// Advances the retransmission timer. On expiry the oldest
    /// outstanding segment is re-emitted; the timeout doubles only while
    /// the peer advertises a real window, so zero-window probes keep
    /// firing at the base rate.
    pub fn tick(&mut self, delta: Duration) {
        if self.timer.active() {
            self.timer.update(delta);
        }
        if self.timer.expired() {
            let seg = self
                .outstanding
                .front()
                .expect("retransmission timer fired without outstanding segments")
                .clone();
            tracing::trace!(seq_no = seg.seq_no, rto = ?self.rto, "retransmitting");
            self.segments_out.push_back(seg);

            if self.peer_window > 0 {
                self.consecutive_retx += 1;
                self.rto *= 2;
            }
            self.timer.start(self.rto);
        }
    }

    /// Emits a payload-free segment with the given flags. Such segments
    /// are never retransmitted.
    pub fn send_empty_segment(&mut self, syn: bool, fin: bool, rst: bool) {
        if syn {
            self.syn_sent = true;
        }
        if fin {
            self.fin_sent = true;
        }

        let mut seg = self.blank_segment();
        seg.flags.syn = syn;
        seg.flags.fin = fin;
        seg.flags.rst = rst;
        self.next_seq_no += seg.sequence_length() as u64;
        self.segments_out.push_back(seg);
    }

    fn blank_segment(&self) -> TcpPacket {
        TcpPacket {
            src_port: self.quad.src.port(),
            dest_port: self.quad.dst.port(),
            seq_no: seq::wrap(self.next_seq_no, self.isn),
            ack_no: 0,
            flags: TcpFlags::new(),
            window: 0,
            urgent_ptr: 0,
            content: Vec::new(),
        }
    }

    /// Sequence slots sent but not yet acknowledged.
    #[must_use]
    pub fn bytes_in_flight(&self) -> u64 {
        self.outstanding
            .iter()
            .map(|seg| seg.sequence_length() as u64)
            .sum()
    }

    #[must_use]
    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retx
    }

    #[must_use]
    pub fn next_seq_no_abs(&self) -> u64 {
        self.next_seq_no
    }

    #[must_use]
    pub fn stream_in(&self) -> &ByteStream {
        &self.stream
    }

    pub fn stream_in_mut(&mut self) -> &mut ByteStream {
        &mut self.stream
    }

    pub(crate) fn segments_out_mut(&mut self) -> &mut VecDeque<TcpPacket> {
        &mut self.segments_out
    }
}
