//! Extended grapheme cluster segmentation over a codepoint buffer.
//!
//! The segmenter works on a buffer that may still grow, so it distinguishes
//! a boundary it is sure of from "ran out of input": whenever it reaches the
//! end of the examined region without having seen a certain break, it reports
//! the end of the region, and the caller must not treat that cluster as
//! final until more input arrives or the input is known to be over.
//!
//! A cluster is `CR LF | Control | LF | Prepend* core postcore*`, where the
//! core is a Hangul syllable, a Regional Indicator pair, an Extended
//! Pictographic sequence joined by ZWJ, an Indic conjunct or any other
//! non-control codepoint, and the postcore is made of Extend, ZWJ and
//! SpacingMark.

use crate::grapheme_registry::CRLF_CODES;
use crate::props::{
    conjunct_break, grapheme_category, is_extended_pictographic, ConjunctBreak, GraphemeCat,
};
use crate::Grapheme;

/// Returns the end of the grapheme cluster that starts at `first`, never
/// looking at `buffer[last..]`. A return value of `last` may be premature.
pub(crate) fn next_grapheme(buffer: &[u32], first: usize, last: usize) -> usize {
    assert!(
        first < last && last <= buffer.len(),
        "segmentation range {}..{} out of bounds",
        first,
        last
    );
    ClusterScan {
        codes: &buffer[..last],
        pos: first,
    }
    .scan()
    .unwrap_or(last)
}

/// Whether there is a cluster boundary between `a` and `b` no matter what
/// follows `b`.
pub(crate) fn is_certain_break(a: u32, b: u32) -> bool {
    next_grapheme(&[a, b], 0, 2) == 1
}

/// Builds the grapheme for one complete cluster. CR LF becomes a lone LF
/// when `translate_newlines` is set.
pub(crate) fn compose_cluster(codes: &[u32], translate_newlines: bool) -> Grapheme {
    if codes == CRLF_CODES {
        if translate_newlines {
            Grapheme::Scalar(CRLF_CODES[1])
        } else {
            Grapheme::crlf()
        }
    } else {
        Grapheme::from_codepoints(codes)
    }
}

struct ClusterScan<'a> {
    codes: &'a [u32],
    pos: usize,
}

// Every `?` below is "ran out of input before a certain break".
impl ClusterScan<'_> {
    fn code(&self) -> Option<u32> {
        self.codes.get(self.pos).copied()
    }

    fn cat(&self) -> Option<GraphemeCat> {
        self.code().map(grapheme_category)
    }

    fn scan(mut self) -> Option<usize> {
        match self.cat()? {
            GraphemeCat::GC_CR => {
                self.pos += 1;
                if self.cat()? == GraphemeCat::GC_LF {
                    self.pos += 1;
                }
                return Some(self.pos);
            }
            GraphemeCat::GC_LF | GraphemeCat::GC_Control => return Some(self.pos + 1),
            _ => {}
        }
        while self.cat()? == GraphemeCat::GC_Prepend {
            self.pos += 1;
        }
        if matches!(
            self.cat()?,
            GraphemeCat::GC_CR | GraphemeCat::GC_LF | GraphemeCat::GC_Control
        ) {
            return Some(self.pos);
        }
        self.core()
    }

    fn core(&mut self) -> Option<usize> {
        let cp = self.code()?;
        match grapheme_category(cp) {
            GraphemeCat::GC_L
            | GraphemeCat::GC_V
            | GraphemeCat::GC_LV
            | GraphemeCat::GC_LVT
            | GraphemeCat::GC_T => self.hangul_syllable()?,
            GraphemeCat::GC_Regional_Indicator => {
                self.pos += 1;
                if self.cat()? == GraphemeCat::GC_Regional_Indicator {
                    self.pos += 1;
                }
            }
            _ if is_extended_pictographic(cp) => return self.pictographic_sequence(),
            _ if conjunct_break(cp) == ConjunctBreak::Consonant => return self.conjunct(),
            _ => self.pos += 1,
        }
        self.postcore()
    }

    /// `L* (V+ | LV V* | LVT) T* | L+ | T+`
    fn hangul_syllable(&mut self) -> Option<()> {
        let start = self.pos;
        let mut cat = self.cat()?;
        while cat == GraphemeCat::GC_L {
            self.pos += 1;
            cat = self.cat()?;
        }
        let mut nucleus = false;
        match cat {
            GraphemeCat::GC_V | GraphemeCat::GC_LV => {
                nucleus = true;
                self.pos += 1;
                cat = self.cat()?;
                while cat == GraphemeCat::GC_V {
                    self.pos += 1;
                    cat = self.cat()?;
                }
            }
            GraphemeCat::GC_LVT => {
                nucleus = true;
                self.pos += 1;
                cat = self.cat()?;
            }
            _ => {}
        }
        if nucleus || self.pos == start {
            while cat == GraphemeCat::GC_T {
                self.pos += 1;
                cat = self.cat()?;
            }
        }
        Some(())
    }

    /// `ExtPict (Extend* ZWJ ExtPict)*` followed by an ordinary postcore.
    fn pictographic_sequence(&mut self) -> Option<usize> {
        self.pos += 1;
        let mut joinable = true;
        loop {
            match self.cat()? {
                GraphemeCat::GC_Extend => self.pos += 1,
                GraphemeCat::GC_ZWJ => {
                    self.pos += 1;
                    if joinable && is_extended_pictographic(self.code()?) {
                        self.pos += 1;
                        continue;
                    }
                    joinable = false;
                }
                GraphemeCat::GC_SpacingMark => {
                    self.pos += 1;
                    joinable = false;
                }
                _ => return Some(self.pos),
            }
        }
    }

    /// `Consonant ([Extend Linker]* Linker [Extend Linker]* Consonant)*`
    /// followed by an ordinary postcore.
    fn conjunct(&mut self) -> Option<usize> {
        self.pos += 1;
        let mut linked = false;
        loop {
            match conjunct_break(self.code()?) {
                ConjunctBreak::Linker => linked = true,
                ConjunctBreak::Extend => {}
                ConjunctBreak::Consonant if linked => linked = false,
                _ => break,
            }
            self.pos += 1;
        }
        self.postcore()
    }

    fn postcore(&mut self) -> Option<usize> {
        loop {
            match self.cat()? {
                GraphemeCat::GC_Extend | GraphemeCat::GC_ZWJ | GraphemeCat::GC_SpacingMark => {
                    self.pos += 1
                }
                _ => return Some(self.pos),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use unicode_segmentation::UnicodeSegmentation;

    fn clusters(codes: &[u32]) -> Vec<Vec<u32>> {
        let mut result = Vec::new();
        let mut pos = 0;
        while pos < codes.len() {
            let end = next_grapheme(codes, pos, codes.len());
            result.push(codes[pos..end].to_vec());
            pos = end;
        }
        result
    }

    fn lengths(s: &str) -> Vec<usize> {
        let codes = s.chars().map(u32::from).collect::<Vec<_>>();
        clusters(&codes).iter().map(Vec::len).collect()
    }

    #[test]
    fn test_crlf_and_controls() {
        assert_eq!(vec![2], lengths("\r\n"));
        assert_eq!(vec![1, 1], lengths("\n\r"));
        assert_eq!(vec![1, 1, 1], lengths("a\u{7}b"));
        assert_eq!(vec![1, 2], lengths("a\r\n"));
    }

    #[test]
    fn test_marks_attach() {
        assert_eq!(vec![3, 1], lengths("e\u{301}\u{323}x"));
        assert_eq!(vec![1, 2], lengths("\u{301}a\u{903}"));
        assert_eq!(vec![2], lengths("\u{600}\u{661}"));
        assert_eq!(vec![1, 1], lengths("\u{600}\n"));
    }

    #[test]
    fn test_hangul() {
        assert_eq!(vec![3], lengths("\u{1100}\u{1161}\u{11A8}"));
        assert_eq!(vec![2], lengths("\u{AC00}\u{11A8}"));
        assert_eq!(vec![2, 1], lengths("\u{1100}\u{1100}\u{11A8}"));
        assert_eq!(vec![1, 1], lengths("\u{AC01}\u{1161}"));
    }

    #[test]
    fn test_regional_indicators_pair_up() {
        assert_eq!(vec![2, 2, 1], lengths("\u{1F1FA}\u{1F1F8}\u{1F1EB}\u{1F1F7}\u{1F1EA}"));
    }

    #[test]
    fn test_emoji_zwj_sequence() {
        // man + ZWJ + woman + ZWJ + girl
        assert_eq!(vec![5], lengths("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}"));
        assert_eq!(vec![2, 1], lengths("a\u{200D}\u{1F469}"));
    }

    #[test]
    fn test_indic_conjunct() {
        // KA + VIRAMA + SSA
        assert_eq!(vec![3], lengths("\u{915}\u{94D}\u{937}"));
        // KA + NUKTA + VIRAMA + ZWJ + SSA
        assert_eq!(vec![5], lengths("\u{915}\u{93C}\u{94D}\u{200D}\u{937}"));
        assert_eq!(vec![1, 1], lengths("\u{915}\u{937}"));
    }

    #[test]
    fn test_reports_last_when_undecided() {
        assert_eq!(1, next_grapheme(&[0x61], 0, 1));
        assert_eq!(2, next_grapheme(&[0x61, 0x301], 0, 2));
        assert_eq!(1, next_grapheme(&[0x0D, 0x0A], 0, 1));
        assert_eq!(1, next_grapheme(&[0x61, 0x62, 0x301], 0, 2));
        assert_eq!(3, next_grapheme(&[0x61, 0x62, 0x301], 1, 3));
    }

    #[test]
    fn test_resumes_mid_chain() {
        let family = [0x1F468, 0x200D, 0x1F469, 0x61];
        assert_eq!(2, next_grapheme(&family, 0, 2));
        assert_eq!(3, next_grapheme(&family, 0, 3));
        assert_eq!(3, next_grapheme(&family, 0, 4));

        let flag = [0x1F1FA, 0x1F1F8];
        assert_eq!(1, next_grapheme(&flag, 0, 1));
        assert_eq!(2, next_grapheme(&flag, 0, 2));

        // KA + VIRAMA + SSA
        let conjunct = [0x915, 0x94D, 0x937];
        assert_eq!(2, next_grapheme(&conjunct, 0, 2));
        assert_eq!(3, next_grapheme(&conjunct, 0, 3));
    }

    #[test]
    fn test_certain_break() {
        assert!(is_certain_break(0x61, 0x62));
        assert!(!is_certain_break(0x61, 0x301));
        assert!(!is_certain_break(0x0D, 0x0A));
        assert!(is_certain_break(0x0A, 0x61));
        assert!(!is_certain_break(0x0600, 0x61));
    }

    #[test]
    fn test_compose_cluster() {
        assert_eq!(Grapheme::crlf(), compose_cluster(&[0x0D, 0x0A], false));
        assert_eq!(Grapheme::Scalar(0x0A), compose_cluster(&[0x0D, 0x0A], true));
        assert_eq!(Grapheme::Scalar(0x61), compose_cluster(&[0x61], true));
    }

    fn alphabet() -> impl Strategy<Value = char> {
        prop::sample::select(vec![
            'a', 'e', ' ', '\r', '\n', '\u{301}', '\u{323}', '\u{200D}', '\u{1100}', '\u{1161}',
            '\u{11A8}', '\u{AC00}', '\u{1F1E6}', '\u{1F469}', '\u{903}', '\u{600}',
        ])
    }

    fn chain_alphabet() -> impl Strategy<Value = u32> {
        prop::sample::select(vec![
            0x61, 0x0D, 0x0A, 0x301, 0x903, 0x600, 0x200D, 0x1F468, 0x1F469, 0x1F1FA, 0x1F1F8,
            0x915, 0x93C, 0x94D, 0x937, 0x1100, 0x1161, 0x11A8, 0xAC00,
        ])
    }

    proptest! {
        #[test]
        fn test_truncated_boundary_is_stable(
            codes in prop::collection::vec(chain_alphabet(), 1..16),
        ) {
            let len = codes.len();
            for first in 0..len {
                let full = next_grapheme(&codes, first, len);
                for t in first + 1..=len {
                    // Either the same boundary, or `t` when the cluster may run past it.
                    prop_assert_eq!(full.min(t), next_grapheme(&codes, first, t));
                }
            }
        }

        #[test]
        fn test_matches_unicode_segmentation(chars in prop::collection::vec(alphabet(), 0..24)) {
            let s = chars.iter().collect::<String>();
            let expected = s.graphemes(true).map(|g| g.chars().count()).collect::<Vec<_>>();
            prop_assert_eq!(expected, lengths(&s));
        }
    }
}
