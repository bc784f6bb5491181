
use std::fmt;

const WORD: usize = 64;

/// Fixed-size bitset over item indices (trips or blocks). Used as identity of columns, so two
/// columns covering the same items compare and hash equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoverSet {
    words: Vec<u64>,
    len: usize,
}

// static functions
impl CoverSet {
    pub fn new(len: usize) -> CoverSet {
        CoverSet {
            words: vec![0; len.div_ceil(WORD)],
            len,
        }
    }

    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> CoverSet {
        let mut set = CoverSet::new(len);
        for i in indices {
            set.insert(i);
        }
        set
    }
}

// methods
impl CoverSet {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn insert(&mut self, i: usize) {
        debug_assert!(i < self.len, "index {} outside cover set of {}", i, self.len);
        self.words[i / WORD] |= 1u64 << (i % WORD);
    }

    pub fn remove(&mut self, i: usize) {
        self.words[i / WORD] &= !(1u64 << (i % WORD));
    }

    pub fn contains(&self, i: usize) -> bool {
        i < self.len && self.words[i / WORD] & (1u64 << (i % WORD)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_disjoint(&self, other: &CoverSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    pub fn union_with(&mut self, other: &CoverSet) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
    }

    /// Grows the universe, e.g. when new blocks become known. Existing bits are kept.
    pub fn resize(&mut self, len: usize) {
        self.len = len;
        self.words.resize(len.div_ceil(WORD), 0);
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, word)| {
            (0..WORD)
                .filter(move |b| word & (1u64 << b) != 0)
                .map(move |b| w * WORD + b)
        })
    }
}

impl fmt::Debug for CoverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
