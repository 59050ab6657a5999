use fxhash::FxHashMap;
use std::{net::Ipv4Addr, time::Duration};
use types::{iface::MacAddress, ip::Ipv4Packet};

/// Timing knobs of the resolution protocol.
#[derive(Debug, Clone)]
pub struct ArpConfig {
    /// How long a learned mapping stays usable without a refresh.
    pub validity: Duration,
    /// Minimum spacing between two requests for the same address.
    pub request_interval: Duration,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            validity: Duration::from_millis(30_000),
            request_interval: Duration::from_millis(5_000),
        }
    }
}

/// The neighbor cache of one interface, together with the datagrams
/// parked while their next hop is still being resolved.
#[derive(Debug)]
pub struct ArpTable {
    map: FxHashMap<Ipv4Addr, ArpEntryInternal>,
    requests: FxHashMap<Ipv4Addr, ActiveRequest>,
    config: ArpConfig,
    now: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArpEntryInternal {
    mac: MacAddress,
    last_refreshed: Duration,
}

#[derive(Debug)]
struct ActiveRequest {
    last_request: Option<Duration>,
    buffer: Vec<Ipv4Packet>,
}

impl ArpTable {
    #[must_use]
    pub fn new() -> Self {
        Self::new_with(ArpConfig::default())
    }

    #[must_use]
    pub fn new_with(config: ArpConfig) -> Self {
        Self {
            map: FxHashMap::default(),
            requests: FxHashMap::default(),
            config,
            now: Duration::ZERO,
        }
    }

    pub fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        let entry = self.map.get(&ip)?;
        if self.now - entry.last_refreshed < self.config.validity {
            Some(entry.mac)
        } else {
            None
        }
    }

    /// Learns (or refreshes) a mapping and releases every datagram that
    /// was parked waiting for it.
    pub fn update(&mut self, ip: Ipv4Addr, mac: MacAddress) -> Vec<Ipv4Packet> {
        tracing::trace!(%ip, %mac, "refreshing neighbor entry");
        self.map.insert(
            ip,
            ArpEntryInternal {
                mac,
                last_refreshed: self.now,
            },
        );
        self.requests
            .remove(&ip)
            .map(|request| request.buffer)
            .unwrap_or_default()
    }

    /// Parks `dgram` until `ip` resolves. Returns whether the caller
    /// should broadcast a request: at most one goes out per address and
    /// request interval.
    pub fn wait_for(&mut self, ip: Ipv4Addr, dgram: Ipv4Packet) -> bool {
        let now = self.now;
        let interval = self.config.request_interval;

        let request = self.requests.entry(ip).or_insert(ActiveRequest {
            last_request: None,
            buffer: Vec::with_capacity(4),
        });
        request.buffer.push(dgram);

        let due = request
            .last_request
            .map_or(true, |last| now - last > interval);
        if due {
            request.last_request = Some(now);
        }
        due
    }

    /// Advances the clock and evicts entries that outlived their
    /// validity.
    pub fn tick(&mut self, delta: Duration) {
        self.now += delta;
        let now = self.now;
        let validity = self.config.validity;
        self.map
            .retain(|_, entry| now - entry.last_refreshed < validity);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for ArpTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ip::Ipv4Flags;

    const MS: Duration = Duration::from_millis(1);

    fn dgram(dst: Ipv4Addr) -> Ipv4Packet {
        Ipv4Packet {
            dscp: 0,
            enc: 0,
            identification: 0,
            flags: Ipv4Flags {
                df: false,
                mf: false,
            },
            fragment_offset: 0,
            ttl: 64,
            proto: 17,
            src: Ipv4Addr::new(10, 0, 0, 1),
            dst,
            content: vec![1, 2, 3],
        }
    }

    #[test]
    fn requests_are_rate_limited_to_the_interval() {
        let mut table = ArpTable::new();
        let hop = Ipv4Addr::new(10, 0, 0, 2);

        assert!(table.wait_for(hop, dgram(hop)));
        assert!(!table.wait_for(hop, dgram(hop)));

        table.tick(5000 * MS);
        assert!(!table.wait_for(hop, dgram(hop)));

        table.tick(MS);
        assert!(table.wait_for(hop, dgram(hop)));
    }

    #[test]
    fn update_flushes_every_waiting_datagram() {
        let mut table = ArpTable::new();
        let hop = Ipv4Addr::new(10, 0, 0, 2);

        table.wait_for(hop, dgram(hop));
        table.wait_for(hop, dgram(hop));
        table.wait_for(Ipv4Addr::new(10, 0, 0, 3), dgram(Ipv4Addr::new(10, 0, 0, 3)));

        let flushed = table.update(hop, MacAddress::from([1, 2, 3, 4, 5, 6]));
        assert_eq!(flushed.len(), 2);
        assert_eq!(table.lookup(hop), Some(MacAddress::from([1, 2, 3, 4, 5, 6])));

        // a second reply has nothing left to flush
        assert!(table.update(hop, MacAddress::from([1, 2, 3, 4, 5, 6])).is_empty());
    }

    #[test]
    fn entries_expire_after_the_validity_window() {
        let mut table = ArpTable::new();
        let hop = Ipv4Addr::new(10, 0, 0, 2);
        let mac = MacAddress::from([1, 2, 3, 4, 5, 6]);

        table.update(hop, mac);
        table.tick(29_999 * MS);
        assert_eq!(table.lookup(hop), Some(mac));

        table.tick(MS);
        assert_eq!(table.lookup(hop), None);
        assert!(table.is_empty());
    }

    #[test]
    fn refresh_restarts_the_validity_window() {
        let mut table = ArpTable::new();
        let hop = Ipv4Addr::new(10, 0, 0, 2);
        let mac = MacAddress::from([1, 2, 3, 4, 5, 6]);

        table.update(hop, mac);
        table.tick(20_000 * MS);
        table.update(hop, mac);
        table.tick(20_000 * MS);
        assert_eq!(table.lookup(hop), Some(mac));
    }
}
