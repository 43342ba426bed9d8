use crate::props::{grapheme_category, CodepointVec, GraphemeCat};
use std::{cell::RefCell, collections::HashMap};

/// Codepoints of the CRLF synthetic, which always takes the first slot.
pub(crate) const CRLF_CODES: [u32; 2] = [0x0D, 0x0A];

struct Synthetic {
    codes: Box<[u32]>,
    base_index: Option<usize>,
    is_utf8_c8: bool,
}

/// Per-thread table of multi-codepoint graphemes. Entries are never removed,
/// so an index stays valid for the life of the thread.
pub(crate) struct GraphemeRegistry {
    synthetics: RefCell<Vec<Synthetic>>,
    lookup: RefCell<HashMap<(CodepointVec, bool), u32>>,
}

impl Default for GraphemeRegistry {
    fn default() -> Self {
        let registry = GraphemeRegistry {
            synthetics: RefCell::new(Vec::new()),
            lookup: RefCell::new(HashMap::new()),
        };
        let crlf = registry.intern(&CRLF_CODES, false);
        debug_assert_eq!(0, crlf);
        registry
    }
}

fn base_index(codes: &[u32]) -> Option<usize> {
    codes
        .iter()
        .position(|&cp| grapheme_category(cp) != GraphemeCat::GC_Prepend)
}

impl GraphemeRegistry {
    /// Returns the index of the synthetic for `codes`, registering it first
    /// if this thread has not seen it yet.
    pub(crate) fn intern(&self, codes: &[u32], is_utf8_c8: bool) -> u32 {
        let key = (CodepointVec::from_slice(codes), is_utf8_c8);
        if let Some(&idx) = self.lookup.borrow().get(&key) {
            return idx;
        }
        let mut synthetics = self.synthetics.borrow_mut();
        let idx = u32::try_from(synthetics.len()).expect("synthetic grapheme table exhausted");
        synthetics.push(Synthetic {
            codes: codes.into(),
            base_index: base_index(codes),
            is_utf8_c8,
        });
        self.lookup.borrow_mut().insert(key, idx);
        idx
    }

    pub(crate) fn is_valid_idx(&self, idx: u32) -> bool {
        usize::try_from(idx).map_or(false, |idx| idx < self.synthetics.borrow().len())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.synthetics.borrow().len()
    }

    pub(crate) fn with_synthetic<F, T>(&self, idx: u32, f: F) -> T
    where
        F: FnOnce(&[u32], Option<usize>, bool) -> T,
    {
        let synthetics = self.synthetics.borrow();
        let synthetic = &synthetics[idx as usize];
        f(&synthetic.codes, synthetic.base_index, synthetic.is_utf8_c8)
    }
}

thread_local! {
    pub(crate) static THREAD_GRAPHEME_REGISTRY: GraphemeRegistry = GraphemeRegistry::default();
}
