use std::time::Duration;

/// Per-connection tuning knobs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the outbound byte stream.
    pub send_buffer_cap: usize,
    /// Capacity of the inbound assembly buffer, also the advertised window.
    pub recv_buffer_cap: usize,
    /// Retransmission timeout before any back-off.
    pub rto_initial: Duration,
    /// Abort the connection after this many consecutive retransmissions.
    pub max_retx: u32,
    /// Largest payload placed into a single segment.
    pub mss: u16,
    /// Fixed initial sequence number; `None` draws a random one.
    pub iss: Option<u32>,
    /// Whether to stay around after both streams finished, absorbing
    /// late retransmissions from the peer.
    pub linger_after_streams_finish: bool,
}

impl Config {
    /// The configured ISN, or a freshly drawn random one.
    pub(crate) fn initial_seq_no(&self) -> u32 {
        self.iss.unwrap_or_else(rand::random)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_buffer_cap: 64 << 10,
            recv_buffer_cap: 64 << 10,
            rto_initial: Duration::from_millis(1000),
            max_retx: 8,
            // RFC 9293 default send MSS for IPv4
            mss: 536,
            iss: None,
            linger_after_streams_finish: true,
        }
    }
}
