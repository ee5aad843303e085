// Packed bit storage for the occupancy grid. Bits are addressed linearly
// (`row * width + column`) and stored 32 to a word, least significant first.

const WORD_BITS: usize = 32;
const WORD_SHIFT: usize = 5;
const WORD_MASK: usize = 0x1f;

/// `RIGHT1[i]` has the low `i` bits set.
const RIGHT1: [u32; WORD_BITS + 1] = build_right1();
/// `RIGHT0[i]` has every bit from `i` upwards set.
const RIGHT0: [u32; WORD_BITS + 1] = build_right0();

const fn build_right1() -> [u32; WORD_BITS + 1] {
    let mut table = [0u32; WORD_BITS + 1];
    let mut i = 1;
    while i <= WORD_BITS {
        table[i] = (table[i - 1] << 1) | 1;
        i += 1;
    }
    table
}

const fn build_right0() -> [u32; WORD_BITS + 1] {
    let right1 = build_right1();
    let mut table = [0u32; WORD_BITS + 1];
    let mut i = 0;
    while i <= WORD_BITS {
        table[i] = !right1[i];
        i += 1;
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitWords {
    words: Vec<u32>,
}

impl BitWords {
    pub(crate) fn with_bits(bits: usize) -> Self {
        Self {
            words: vec![0; (bits + WORD_BITS) >> WORD_SHIFT],
        }
    }

    fn locate(bit: usize) -> (usize, u32) {
        (bit >> WORD_SHIFT, 1u32 << (bit & WORD_MASK))
    }

    pub(crate) fn set(&mut self, bit: usize) {
        let (word, mask) = Self::locate(bit);
        self.words[word] |= mask;
    }

    pub(crate) fn clear(&mut self, bit: usize) {
        let (word, mask) = Self::locate(bit);
        self.words[word] &= !mask;
    }

    pub(crate) fn test(&self, bit: usize) -> bool {
        let (word, mask) = Self::locate(bit);
        self.words[word] & mask != 0
    }

    /// Masks selecting `start..=end` in the first and last word of the span.
    fn span_masks(start: usize, end: usize) -> (usize, usize, u32, u32) {
        let first = start >> WORD_SHIFT;
        let last = end >> WORD_SHIFT;
        let head = RIGHT0[start & WORD_MASK];
        let tail = RIGHT1[(end & WORD_MASK) + 1];
        (first, last, head, tail)
    }

    /// Sets every bit in `start..=end`. Requires `start <= end`.
    pub(crate) fn set_span(&mut self, start: usize, end: usize) {
        let (first, last, head, tail) = Self::span_masks(start, end);
        if first == last {
            self.words[first] |= head & tail;
            return;
        }
        self.words[first] |= head;
        self.words[last] |= tail;
        for word in &mut self.words[first + 1..last] {
            *word = u32::MAX;
        }
    }

    /// Clears every bit in `start..=end`. Requires `start <= end`.
    pub(crate) fn clear_span(&mut self, start: usize, end: usize) {
        let (first, last, head, tail) = Self::span_masks(start, end);
        if first == last {
            self.words[first] &= !(head & tail);
            return;
        }
        self.words[first] &= !head;
        self.words[last] &= !tail;
        for word in &mut self.words[first + 1..last] {
            *word = 0;
        }
    }

    /// True if any bit in `start..=end` is set. Requires `start <= end`.
    pub(crate) fn any_in_span(&self, start: usize, end: usize) -> bool {
        let (first, last, head, tail) = Self::span_masks(start, end);
        if first == last {
            return self.words[first] & head & tail != 0;
        }
        if self.words[first] & head != 0 || self.words[last] & tail != 0 {
            return true;
        }
        self.words[first + 1..last].iter().any(|word| *word != 0)
    }

    pub(crate) fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub(crate) fn reset(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_tables_cover_word_edges() {
        assert_eq!(RIGHT1[0], 0);
        assert_eq!(RIGHT1[1], 0x1);
        assert_eq!(RIGHT1[32], u32::MAX);
        assert_eq!(RIGHT0[0], u32::MAX);
        assert_eq!(RIGHT0[31], 0x8000_0000);
        assert_eq!(RIGHT0[32], 0);
    }

    #[test]
    fn span_inside_one_word() {
        let mut bits = BitWords::with_bits(64);
        bits.set_span(3, 6);
        assert!(!bits.test(2));
        assert!((3..=6).all(|bit| bits.test(bit)));
        assert!(!bits.test(7));
        assert_eq!(bits.count_ones(), 4);
    }

    #[test]
    fn span_across_words_fills_middle() {
        let mut bits = BitWords::with_bits(200);
        bits.set_span(30, 130);
        assert_eq!(bits.count_ones(), 101);
        assert!(bits.any_in_span(0, 30));
        assert!(!bits.any_in_span(0, 29));
        assert!(!bits.any_in_span(131, 199));
        assert!(bits.any_in_span(64, 95));
    }

    #[test]
    fn clear_span_leaves_neighbours() {
        let mut bits = BitWords::with_bits(128);
        bits.set_span(0, 127);
        bits.clear_span(20, 70);
        assert!(bits.test(19));
        assert!(!bits.any_in_span(20, 70));
        assert!(bits.test(71));
        assert_eq!(bits.count_ones(), 128 - 51);
    }

    #[test]
    fn single_bits_are_not_refcounted() {
        let mut bits = BitWords::with_bits(40);
        bits.set(33);
        bits.set(33);
        bits.clear(33);
        assert!(!bits.test(33));
        bits.set(5);
        bits.reset();
        assert_eq!(bits.count_ones(), 0);
    }
}
