//! Streaming normalization to NFD, NFKD, NFC, NFKC and NFG.
//!
//! A [`Normalizer`] takes one codepoint at a time and hands back normalized
//! output as soon as it can prove that nothing later in the input can change
//! it. Runs of simple starters take a fast path that never touches the
//! decomposition, ordering or composition machinery.
//!
//! NFG is NFC with each extended grapheme cluster folded into a single
//! [`Grapheme`]; clusters of more than one codepoint become synthetics
//! registered on the current thread.

use crate::compose::{canonical_composition, canonical_sort};
use crate::decompose::decompose_into;
use crate::error::InvalidFormError;
use crate::grapheme_registry::CRLF_CODES;
use crate::props::{self, GraphemeCat, QuickCheck};
use crate::segment::{compose_cluster, is_certain_break, next_grapheme};
use crate::{Grapheme, NfgString};
use std::mem;

const CR: u32 = 0x0D;
const LF: u32 = 0x0A;

// Consumed output is only shifted out once this much of it piles up.
const COMPACT_THRESHOLD: usize = 64;

/// A Unicode normalization form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NormalForm {
    /// Canonical decomposition.
    Nfd,
    /// Compatibility decomposition.
    Nfkd,
    /// Canonical decomposition followed by canonical composition.
    Nfc,
    /// Compatibility decomposition followed by canonical composition.
    Nfkc,
    /// NFC with every grapheme cluster folded into one grapheme.
    Nfg,
}

impl NormalForm {
    /// Whether compatibility mappings are applied.
    pub fn is_compatibility(self) -> bool {
        matches!(self, NormalForm::Nfkd | NormalForm::Nfkc)
    }

    /// Whether canonical composition is applied.
    pub fn composes(self) -> bool {
        matches!(self, NormalForm::Nfc | NormalForm::Nfkc | NormalForm::Nfg)
    }

    /// Whether grapheme clusters are folded into single graphemes.
    pub fn groups_graphemes(self) -> bool {
        self == NormalForm::Nfg
    }

    /// Codepoints below this value have no interesting properties in this
    /// form and are eligible for the fast path.
    fn first_significant(self) -> u32 {
        match self {
            NormalForm::Nfd => 0xC0,
            NormalForm::Nfkd | NormalForm::Nfkc => 0xA0,
            NormalForm::Nfc | NormalForm::Nfg => 0x300,
        }
    }

    fn quick_check(self) -> QuickCheck {
        match self {
            NormalForm::Nfd => QuickCheck::Nfd,
            NormalForm::Nfkd => QuickCheck::Nfkd,
            NormalForm::Nfc | NormalForm::Nfg => QuickCheck::Nfc,
            NormalForm::Nfkc => QuickCheck::Nfkc,
        }
    }
}

/// Maps the integer codes 1 to 4 onto NFC, NFD, NFKC and NFKD.
impl TryFrom<i64> for NormalForm {
    type Error = InvalidFormError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(NormalForm::Nfc),
            2 => Ok(NormalForm::Nfd),
            3 => Ok(NormalForm::Nfkc),
            4 => Ok(NormalForm::Nfkd),
            _ => Err(InvalidFormError(code)),
        }
    }
}

/// Codepoints that never decompose and never interact with their
/// neighbours. Seeing one flushes everything pending, which lets a line be
/// delivered without waiting for one more codepoint of lookahead.
fn is_norm_terminator(cp: u32) -> bool {
    cp < 0x20 || (0x7F..=0x9F).contains(&cp) || cp == 0xAD
}

/// Incremental normalizer state.
///
/// Output that is final sits in `ready` from `start` onwards. Input that is
/// not final yet sits in `pending`: the part before `stable` is already
/// ordered and composed and is only waiting for grapheme boundaries (NFG);
/// the rest is decomposed, except for a starter that passed the quick check
/// and is kept as-is at the very end while `raw_tail` is set.
#[derive(Clone, Debug)]
pub struct Normalizer {
    form: NormalForm,
    first_significant: u32,
    ready: Vec<Grapheme>,
    start: usize,
    pending: Vec<u32>,
    stable: usize,
    raw_tail: bool,
    prepend_buffer: usize,
    translate_newlines: bool,
}

impl Normalizer {
    /// Creates an empty normalizer targeting `form`.
    pub fn new(form: NormalForm) -> Self {
        Normalizer {
            form,
            first_significant: form.first_significant(),
            ready: Vec::new(),
            start: 0,
            pending: Vec::new(),
            stable: 0,
            raw_tail: false,
            prepend_buffer: 0,
            translate_newlines: false,
        }
    }

    /// The form this normalizer produces.
    pub fn form(&self) -> NormalForm {
        self.form
    }

    /// Makes NFG output turn CR LF into a lone LF.
    pub fn translate_newlines(&mut self) {
        self.translate_newlines = true;
    }

    /// Feeds one codepoint.
    ///
    /// Returns `None` while more input is needed. Otherwise returns the
    /// oldest normalized grapheme together with the number of graphemes that
    /// were ready, the returned one included; the rest can be taken with
    /// [`get_grapheme`](Self::get_grapheme).
    pub fn process_codepoint(&mut self, cp: u32) -> Option<(Grapheme, usize)> {
        self.compact_ready();
        if is_norm_terminator(cp) && !(cp == CR && self.form.groups_graphemes()) {
            return self.process_norm_terminator(cp);
        }
        if cp < self.first_significant
            && cp != CR
            && self.prepend_buffer == 0
            && self.available() == 0
        {
            if !self.form.composes() {
                if self.pending.is_empty() {
                    return Some((Grapheme::Scalar(cp), 1));
                }
            } else if self.pending.len() == 1
                && self.raw_tail
                && self.pending[0] < self.first_significant
            {
                let previous = mem::replace(&mut self.pending[0], cp);
                return Some((Grapheme::Scalar(previous), 1));
            }
        }
        self.process_codepoint_full(cp)
    }

    fn process_codepoint_full(&mut self, cp: u32) -> Option<(Grapheme, usize)> {
        let passes = props::passes_quick_check(cp, self.form.quick_check());
        let starter = props::canonical_combining_class(cp) == 0;
        let prepend = self.form.groups_graphemes()
            && props::grapheme_category(cp) == GraphemeCat::GC_Prepend;

        if !(passes && starter) {
            self.decompose_raw_tail();
            decompose_into(cp, self.form.is_compatibility(), &mut self.pending);
            self.note_prepend(prepend);
            return self.next_ready();
        }

        if self.prepend_buffer == 0 && self.available() == 0 {
            if !self.form.composes() {
                if self.pending.is_empty() {
                    return Some((Grapheme::Scalar(cp), 1));
                }
            } else if self.pending.len() == 1 && self.raw_tail {
                let previous = self.pending[0];
                if !self.form.groups_graphemes() || is_certain_break(previous, cp) {
                    self.pending[0] = cp;
                    self.note_prepend(prepend);
                    return Some((Grapheme::Scalar(previous), 1));
                }
            }
        }

        // Nothing before a quick-check starter can reorder or compose with
        // anything after it.
        self.normalize_pending();
        if self.form.composes() {
            self.pending.push(cp);
            self.raw_tail = true;
            self.note_prepend(prepend);
            if self.form.groups_graphemes() {
                self.fold_clusters(false);
            }
        } else {
            self.ready.push(Grapheme::Scalar(cp));
        }
        self.next_ready()
    }

    fn process_norm_terminator(&mut self, cp: u32) -> Option<(Grapheme, usize)> {
        if self.form.groups_graphemes() && cp == LF && self.pending.last() == Some(&CR) {
            self.pending.pop();
            self.raw_tail = false;
            self.eof();
            self.ready
                .push(compose_cluster(&CRLF_CODES, self.translate_newlines));
        } else {
            self.eof();
            self.ready.push(Grapheme::Scalar(cp));
        }
        self.next_ready()
    }

    /// Feeds one grapheme. Scalars are processed like codepoints; synthetics
    /// standing for undecodable bytes flush pending input and pass through.
    ///
    /// # Panics
    ///
    /// Panics on any other synthetic, since those are already normalized
    /// clusters that cannot be taken apart here.
    pub fn process_grapheme(&mut self, g: Grapheme) -> Option<(Grapheme, usize)> {
        match g {
            Grapheme::Scalar(cp) => self.process_codepoint(cp),
            Grapheme::Synthetic(_) => {
                assert!(
                    g.is_utf8_c8(),
                    "cannot renormalize an already composed synthetic grapheme"
                );
                self.compact_ready();
                self.eof();
                self.ready.push(g);
                self.next_ready()
            }
        }
    }

    /// Queues codepoints for normalization without handing any output back.
    /// They are picked up by later calls like any other pending input.
    pub fn push_codepoints(&mut self, codes: &[u32]) {
        for &cp in codes {
            self.decompose_raw_tail();
            decompose_into(cp, self.form.is_compatibility(), &mut self.pending);
            let prepend = self.form.groups_graphemes()
                && props::grapheme_category(cp) == GraphemeCat::GC_Prepend;
            self.note_prepend(prepend);
        }
    }

    /// Signals the end of input: everything pending is normalized and made
    /// available. Calling it with nothing pending does nothing.
    pub fn eof(&mut self) {
        self.normalize_pending();
        if self.form.groups_graphemes() {
            self.fold_clusters(true);
        }
        self.prepend_buffer = 0;
    }

    /// The number of normalized graphemes ready to be taken.
    pub fn available(&self) -> usize {
        self.ready.len() - self.start
    }

    /// Whether nothing is ready and nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.available() == 0 && self.pending.is_empty()
    }

    /// Takes the next normalized grapheme.
    ///
    /// # Panics
    ///
    /// Panics if nothing is [available](Self::available).
    pub fn get_grapheme(&mut self) -> Grapheme {
        assert!(self.available() > 0, "no normalized output available");
        let g = self.ready[self.start];
        self.start += 1;
        if self.start == self.ready.len() {
            self.ready.clear();
            self.start = 0;
        }
        g
    }

    /// Takes the next normalized codepoint.
    ///
    /// # Panics
    ///
    /// Panics if nothing is available or the next grapheme is a synthetic.
    pub fn get_codepoint(&mut self) -> u32 {
        match self.get_grapheme() {
            Grapheme::Scalar(cp) => cp,
            Grapheme::Synthetic(id) => panic!("{:?} is not a single codepoint", id),
        }
    }

    fn next_ready(&mut self) -> Option<(Grapheme, usize)> {
        let available = self.available();
        if available == 0 {
            return None;
        }
        let g = self.ready[self.start];
        self.start += 1;
        Some((g, available))
    }

    fn compact_ready(&mut self) {
        if self.start == 0 {
            return;
        }
        if self.start == self.ready.len() {
            self.ready.clear();
            self.start = 0;
        } else if self.start >= COMPACT_THRESHOLD && self.start * 2 >= self.ready.len() {
            self.ready.drain(..self.start);
            self.start = 0;
        }
    }

    fn note_prepend(&mut self, prepend: bool) {
        self.prepend_buffer = if prepend { self.prepend_buffer + 1 } else { 0 };
    }

    fn decompose_raw_tail(&mut self) {
        if !self.raw_tail {
            return;
        }
        self.raw_tail = false;
        if let Some(tail) = self.pending.pop() {
            decompose_into(tail, self.form.is_compatibility(), &mut self.pending);
        }
    }

    /// Orders and composes `pending[stable..]`. Outside NFG the result is
    /// final; under NFG it still waits for cluster boundaries.
    fn normalize_pending(&mut self) {
        let (from, to) = (self.stable, self.pending.len());
        canonical_sort(&mut self.pending, from, to);
        if self.form.composes() {
            let end = canonical_composition(&mut self.pending, from, to);
            debug_assert_eq!(end, self.pending.len());
        }
        self.raw_tail = false;
        if self.form.groups_graphemes() {
            self.stable = self.pending.len();
        } else {
            self.ready
                .extend(self.pending.iter().map(|&cp| Grapheme::Scalar(cp)));
            self.pending.clear();
            self.stable = 0;
        }
    }

    /// Moves every cluster of `pending` whose end is certain into `ready`.
    /// With `at_eof` the last cluster is final too.
    fn fold_clusters(&mut self, at_eof: bool) {
        let last = self.pending.len();
        let mut pos = 0;
        while pos < last {
            let end = next_grapheme(&self.pending, pos, last);
            if end == last && !at_eof {
                break;
            }
            let g = compose_cluster(&self.pending[pos..end], self.translate_newlines);
            self.ready.push(g);
            pos = end;
        }
        if pos > 0 {
            self.pending.drain(..pos);
            self.stable = self.stable.saturating_sub(pos);
            self.prepend_buffer = self.prepend_buffer.min(self.pending.len());
        }
    }
}

fn normalize_with<F>(codes: &[u32], form: NormalForm, mut sink: F)
where
    F: FnMut(Grapheme),
{
    let mut norm = Normalizer::new(form);
    for &cp in codes {
        if let Some((g, ready)) = norm.process_codepoint(cp) {
            sink(g);
            for _ in 1..ready {
                sink(norm.get_grapheme());
            }
        }
    }
    norm.eof();
    while norm.available() > 0 {
        sink(norm.get_grapheme());
    }
}

/// Normalizes a complete run of codepoints. NFG synthetics are expanded back
/// into their codepoints, so NFG output here is plain NFC.
pub fn normalize_codepoints(codes: &[u32], form: NormalForm) -> Vec<u32> {
    let mut out = Vec::with_capacity(codes.len());
    normalize_with(codes, form, |g| out.extend(g.codepoints()));
    out
}

/// Normalizes a string slice.
pub fn normalize_str(s: &str, form: NormalForm) -> String {
    let codes = s.chars().map(u32::from).collect::<Vec<_>>();
    normalize_codepoints(&codes, form)
        .into_iter()
        .filter_map(char::from_u32)
        .collect()
}

/// Normalizes a complete run of codepoints to NFG.
pub fn codepoints_to_nfg_string(codes: &[u32]) -> NfgString {
    let mut graphemes = Vec::with_capacity(codes.len());
    normalize_with(codes, NormalForm::Nfg, |g| graphemes.push(g));
    NfgString::from_graphemes(graphemes)
}
