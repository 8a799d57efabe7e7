use crate::segment::AudioSegment;

/// Block/hop geometry over a source of known length.
///
/// Full blocks start at `0, hop, 2*hop, ...` while they fit. If samples
/// remain after the last full block (or the source is shorter than a block),
/// one extra block at the next hop position is zero-padded to full length.
///
/// # Example
/// ```
/// use eb_audio::stream::BlockLayout;
/// // 5.25 s @ 44.1 kHz, 2.5 s blocks, 0.5 s hop
/// let layout = BlockLayout::new(231_525, 110_250, 22_050);
/// assert_eq!(layout.full_blocks(), 6);
/// assert_eq!(layout.count(), 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    source_len: usize,
    block: usize,
    hop: usize,
}

impl BlockLayout {
    /// `block` and `hop` are clamped to at least 1.
    #[must_use]
    pub fn new(source_len: usize, block: usize, hop: usize) -> Self {
        Self {
            source_len,
            block: block.max(1),
            hop: hop.max(1),
        }
    }

    /// Blocks that fit entirely inside the source.
    #[must_use]
    pub fn full_blocks(&self) -> usize {
        if self.source_len < self.block {
            0
        } else {
            (self.source_len - self.block) / self.hop + 1
        }
    }

    /// Total blocks, padded tail included.
    #[must_use]
    pub fn count(&self) -> usize {
        if self.source_len == 0 {
            return 0;
        }
        let full = self.full_blocks();
        if full == 0 {
            return 1;
        }
        let covered = (full - 1) * self.hop + self.block;
        if covered < self.source_len { full + 1 } else { full }
    }

    /// First sample of block `index`.
    #[must_use]
    pub fn start(&self, index: usize) -> usize {
        index * self.hop
    }

    #[must_use]
    pub fn block_len(&self) -> usize {
        self.block
    }

    /// Block `index` as an owned, zero-padded segment.
    #[must_use]
    pub fn segment(&self, source: &[f32], index: usize, sample_rate: u32) -> AudioSegment {
        AudioSegment::padded(source, self.start(index), self.block, sample_rate)
    }
}

/// Lazy, finite iterator of `(block_index, segment)` over a sample buffer.
///
/// Consumed by iteration; it cannot be rewound.
///
/// # Example
/// ```
/// use eb_audio::stream::BlockStream;
/// let source = vec![0.5f32; 25];
/// let blocks: Vec<_> = BlockStream::new(&source, 44100, 10, 5).collect();
/// assert_eq!(blocks.len(), 4);
/// assert_eq!(blocks[3].0, 3);
/// assert_eq!(blocks[3].1.len(), 10);
/// ```
pub struct BlockStream<'a> {
    source: &'a [f32],
    sample_rate: u32,
    layout: BlockLayout,
    next: usize,
    total: usize,
}

impl<'a> BlockStream<'a> {
    #[must_use]
    pub fn new(source: &'a [f32], sample_rate: u32, block: usize, hop: usize) -> Self {
        let layout = BlockLayout::new(source.len(), block, hop);
        Self {
            source,
            sample_rate,
            layout,
            next: 0,
            total: layout.count(),
        }
    }
}

impl Iterator for BlockStream<'_> {
    type Item = (usize, AudioSegment);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some((index, self.layout.segment(self.source, index, self.sample_rate)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BlockStream<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 110_250;
    const HOP: usize = 22_050;

    #[test]
    fn exact_full_blocks_no_tail() {
        for k in 1..5 {
            let len = BLOCK + (k - 1) * HOP;
            let source = vec![0.1f32; len];
            let keys: Vec<usize> = BlockStream::new(&source, 44100, BLOCK, HOP)
                .map(|(i, seg)| {
                    assert_eq!(seg.len(), BLOCK);
                    assert!(seg.samples().iter().all(|&s| s == 0.1));
                    i
                })
                .collect();
            assert_eq!(keys, (0..k).collect::<Vec<_>>());
        }
    }

    #[test]
    fn partial_tail_adds_one_padded_block() {
        let k = 3;
        let len = BLOCK + (k - 1) * HOP + 1000;
        let source = vec![1.0f32; len];
        let blocks: Vec<_> = BlockStream::new(&source, 44100, BLOCK, HOP).collect();
        assert_eq!(blocks.len(), k + 1);
        let (idx, last) = &blocks[k];
        assert_eq!(*idx, k);
        assert_eq!(last.len(), BLOCK);
        let real = len - k * HOP;
        assert!(last.samples()[..real].iter().all(|&s| s == 1.0));
        assert!(last.samples()[real..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn five_and_a_quarter_seconds() {
        let len = (5.25 * 44100.0) as usize;
        let expected = (len - BLOCK) / HOP + 2;
        assert_eq!(expected, 7);
        let source = vec![0.0f32; len];
        assert_eq!(BlockStream::new(&source, 44100, BLOCK, HOP).count(), 7);
    }

    #[test]
    fn short_and_empty_sources() {
        assert_eq!(BlockLayout::new(0, BLOCK, HOP).count(), 0);
        assert_eq!(BlockLayout::new(10, BLOCK, HOP).count(), 1);
        let mut stream = BlockStream::new(&[0.3; 10], 44100, BLOCK, HOP);
        assert_eq!(stream.len(), 1);
        let (_, seg) = stream.next().unwrap();
        assert_eq!(seg.len(), BLOCK);
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }
}
