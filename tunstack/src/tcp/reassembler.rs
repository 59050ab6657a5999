use super::stream::ByteStream;
use std::collections::BTreeMap;

/// Reorders substrings of a byte stream into their original sequence.
///
/// Substrings arrive indexed into the stream, possibly overlapping and in
/// any order. The contiguous prefix is pushed into the output stream as
/// soon as it exists; everything else waits in a set of disjoint pending
/// fragments. Output buffer and pending fragments together never exceed
/// the configured capacity, and no byte beyond the reader-anchored window
/// of `capacity` bytes is stored at all.
#[derive(Debug)]
pub struct Reassembler {
    out: ByteStream,
    capacity: usize,

    /// Index of the next byte to be written to `out`.
    wait_index: u64,
    /// Disjoint out-of-order fragments, keyed by their first index.
    pending: BTreeMap<u64, Vec<u8>>,
    /// Index one past the final byte of the stream, once known.
    eof_index: Option<u64>,
}

impl Reassembler {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            out: ByteStream::new(capacity),
            capacity,
            wait_index: 0,
            pending: BTreeMap::new(),
            eof_index: None,
        }
    }

    /// Accepts the substring `data` occupying `[index, index + len)` of
    /// the stream. `eof` marks it as containing the final byte.
    pub fn push(&mut self, data: &[u8], index: u64, eof: bool) {
        if eof {
            self.eof_index = Some(index + data.len() as u64);
        }

        // drop everything already written out
        let skip = self.wait_index.saturating_sub(index) as usize;
        if skip >= data.len() {
            self.try_end_input();
            return;
        }
        let data = &data[skip..];
        let index = index + skip as u64;

        if index > self.wait_index {
            tracing::trace!(index, len = data.len(), "holding out-of-order fragment");
            self.merge_pending(index, data.to_vec());
        } else {
            let data = self.clamp(index, data);
            let written = self.out.write(data);
            self.wait_index += written as u64;

            // the write may have closed a gap, drain everything now in order
            loop {
                self.realign_pending();
                let Some(fragment) = self.pending.remove(&self.wait_index) else {
                    break;
                };
                let written = self.out.write(&fragment);
                self.wait_index += written as u64;
            }
        }

        self.try_end_input();
    }

    /// The index the next in-order byte must carry.
    #[must_use]
    pub fn wait_index(&self) -> u64 {
        self.wait_index
    }

    /// Total length of the pending fragments.
    #[must_use]
    pub fn unassembled_bytes(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn stream_out(&self) -> &ByteStream {
        &self.out
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        &mut self.out
    }

    /// Clamps `data` to what may be stored at `index`: nothing beyond the
    /// reader-anchored window, and nothing that would push buffered plus
    /// pending bytes over the capacity. The second bound keeps far-right
    /// fragments from starving the bytes still needed to close a gap.
    fn clamp<'a>(&self, index: u64, data: &'a [u8]) -> &'a [u8] {
        let window_end = self.capacity as u64 + self.out.bytes_read();
        let max = (window_end.saturating_sub(index) as usize)
            .min(self.capacity - self.out.len() - self.unassembled_bytes())
            .min(data.len());
        &data[..max]
    }

    /// Re-keys pending fragments that the wait index has overtaken,
    /// dropping their covered prefix.
    fn realign_pending(&mut self) {
        while let Some((&index, _)) = self.pending.range(..self.wait_index).next() {
            let fragment = self.pending.remove(&index).expect("fragment exists");
            let covered = (self.wait_index - index) as usize;
            if covered < fragment.len() {
                self.merge_pending(self.wait_index, fragment[covered..].to_vec());
            }
        }
    }

    /// Inserts a fragment, merging it with every overlapping neighbor.
    fn merge_pending(&mut self, mut index: u64, mut data: Vec<u8>) {
        let mut end = index + data.len() as u64;

        let overlapping: Vec<u64> = self
            .pending
            .range(..end)
            .filter(|(&start, fragment)| start + fragment.len() as u64 > index)
            .map(|(&start, _)| start)
            .collect();

        for start in overlapping {
            let fragment = self.pending.remove(&start).expect("fragment exists");
            let fragment_end = start + fragment.len() as u64;

            if start < index {
                let mut merged = fragment[..(index - start) as usize].to_vec();
                merged.extend_from_slice(&data);
                data = merged;
                index = start;
            }
            if fragment_end > end {
                data.extend_from_slice(&fragment[(end - start) as usize..]);
                end = fragment_end;
            }
        }

        let keep = self.clamp(index, &data).len();
        if keep > 0 {
            data.truncate(keep);
            self.pending.insert(index, data);
        }
    }

    /// Closes the output stream once the final byte has been written and
    /// nothing is left pending.
    fn try_end_input(&mut self) {
        if let Some(eof_index) = self.eof_index {
            if self.pending.is_empty() && self.wait_index >= eof_index {
                self.out.end_input();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(r: &mut Reassembler) -> Vec<u8> {
        let n = r.stream_out().len();
        r.stream_out_mut().read(n)
    }

    #[test]
    fn in_order_passthrough() {
        let mut r = Reassembler::new(64);
        r.push(b"abc", 0, false);
        r.push(b"def", 3, true);
        assert_eq!(assembled(&mut r), b"abcdef");
        assert!(r.stream_out().input_ended());
    }

    #[test]
    fn reordered_fragments_assemble() {
        let mut r = Reassembler::new(64);
        r.push(b"ghi", 6, false);
        r.push(b"def", 3, false);
        assert_eq!(r.unassembled_bytes(), 6);
        assert!(r.stream_out().is_empty());

        r.push(b"abc", 0, false);
        assert_eq!(r.unassembled_bytes(), 0);
        assert_eq!(assembled(&mut r), b"abcdefghi");
    }

    #[test]
    fn overlaps_merge_into_unions() {
        let mut r = Reassembler::new(64);
        r.push(b"cdef", 2, false);
        r.push(b"efgh", 4, false);
        r.push(b"bcd", 1, false);
        assert_eq!(r.unassembled_bytes(), 7);

        r.push(b"ab", 0, false);
        assert_eq!(assembled(&mut r), b"abcdefgh");
        assert_eq!(r.unassembled_bytes(), 0);
    }

    #[test]
    fn duplicate_and_covered_fragments_are_absorbed() {
        let mut r = Reassembler::new(64);
        r.push(b"bcdefg", 1, false);
        r.push(b"cde", 2, false); // wholly covered
        r.push(b"bcdefg", 1, false); // exact duplicate
        assert_eq!(r.unassembled_bytes(), 6);

        r.push(b"a", 0, false);
        assert_eq!(assembled(&mut r), b"abcdefg");
    }

    #[test]
    fn capacity_clamps_far_right_bytes() {
        // With capacity 8 the byte at index 8 must be discarded, yet the
        // stream still terminates because the wait index reaches the
        // recorded end of stream.
        let mut r = Reassembler::new(8);
        r.push(b"abc", 0, false);
        r.push(b"ghi", 6, false);
        r.push(b"def", 3, false);
        r.push(b"", 8, true);

        assert_eq!(assembled(&mut r), b"abcdefgh");
        assert!(r.stream_out().input_ended());
    }

    #[test]
    fn pending_bytes_count_against_capacity() {
        let mut r = Reassembler::new(4);
        r.push(b"bc", 1, false);
        // only one more byte fits next to the two pending ones and the
        // one that will go straight to the output
        r.push(b"a", 0, false);
        assert_eq!(assembled(&mut r), b"abc");
    }

    #[test]
    fn window_is_anchored_at_the_read_cursor() {
        let mut r = Reassembler::new(4);
        r.push(b"abcd", 0, false);
        // full: indices 4.. lie outside the window
        r.push(b"e", 4, false);
        assert_eq!(r.unassembled_bytes(), 0);
        assert_eq!(r.wait_index(), 4);

        // reading advances the window and makes room
        assert_eq!(r.stream_out_mut().read(4), b"abcd");
        r.push(b"ef", 4, false);
        assert_eq!(assembled(&mut r), b"ef");
    }

    #[test]
    fn stale_data_is_ignored_but_termination_still_fires() {
        let mut r = Reassembler::new(8);
        r.push(b"ab", 0, true);
        assert_eq!(assembled(&mut r), b"ab");

        // retransmission of old bytes, fully left of the wait index
        r.push(b"ab", 0, true);
        assert!(r.stream_out().input_ended());
        assert_eq!(r.wait_index(), 2);
    }

    #[test]
    fn eof_with_missing_bytes_does_not_close() {
        let mut r = Reassembler::new(8);
        r.push(b"cd", 2, true);
        assert!(!r.stream_out().input_ended());

        r.push(b"ab", 0, false);
        assert!(r.stream_out().input_ended());
        assert_eq!(assembled(&mut r), b"abcd");
    }

    #[test]
    fn arbitrary_order_converges() {
        use rand::seq::SliceRandom;

        let payload: Vec<u8> = (0..200u8).collect();
        for _ in 0..16 {
            let mut chunks: Vec<(u64, &[u8])> = payload.chunks(7).enumerate().map(
                |(i, chunk)| ((i * 7) as u64, chunk),
            ).collect();
            chunks.shuffle(&mut rand::thread_rng());

            let mut r = Reassembler::new(512);
            for &(index, chunk) in &chunks {
                r.push(chunk, index, index as usize + chunk.len() == payload.len());
            }
            assert_eq!(assembled(&mut r), payload);
            assert!(r.stream_out().input_ended());
        }
    }
}
