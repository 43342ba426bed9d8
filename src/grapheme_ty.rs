use crate::grapheme_registry::{CRLF_CODES, THREAD_GRAPHEME_REGISTRY};
use crate::props::CodepointVec;
use smallvec::smallvec;
use std::{fmt, marker::PhantomData, rc::Rc};

/// Index of a synthetic grapheme in the current thread's registry.
///
/// Synthetics are registered on a per-thread basis, so this id is neither
/// `Send` nor `Sync`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SyntheticId(u32, PhantomData<Rc<()>>);

impl SyntheticId {
    pub(crate) const CRLF: SyntheticId = SyntheticId(0, PhantomData);

    pub(crate) fn from_registry_idx(idx: u32) -> Self {
        SyntheticId(idx, PhantomData)
    }

    /// Retrieves the registry index of this synthetic.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntheticId({})", self.0)
    }
}

/// One element of an NFG string: either a single codepoint that forms a
/// grapheme cluster on its own, or a synthetic standing for a
/// multi-codepoint cluster.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Grapheme {
    /// A lone codepoint.
    Scalar(u32),
    /// A registered multi-codepoint cluster.
    Synthetic(SyntheticId),
}

/// What the registry knows about a synthetic grapheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticInfo {
    /// The codepoints of the cluster, in order.
    pub codes: Vec<u32>,
    /// Position of the first non-Prepend codepoint, if any.
    pub base_index: Option<usize>,
    /// Whether this synthetic stands for undecodable input bytes.
    pub is_utf8_c8: bool,
}

impl Grapheme {
    /// The grapheme for a single `char`.
    pub fn from_char(ch: char) -> Self {
        Grapheme::Scalar(ch as u32)
    }

    /// The CR LF grapheme.
    pub fn crlf() -> Self {
        Grapheme::Synthetic(SyntheticId::CRLF)
    }

    /// Looks up the grapheme formed by `codes`, registering a synthetic on
    /// this thread when there is more than one codepoint.
    ///
    /// No segmentation is performed: the caller asserts that `codes` is one
    /// grapheme cluster.
    ///
    /// # Panics
    ///
    /// Panics if `codes` is empty.
    pub fn from_codepoints(codes: &[u32]) -> Self {
        match codes {
            [] => panic!("a grapheme needs at least one codepoint"),
            [cp] => Grapheme::Scalar(*cp),
            _ => {
                let idx = THREAD_GRAPHEME_REGISTRY.with(|registry| registry.intern(codes, false));
                Grapheme::Synthetic(SyntheticId::from_registry_idx(idx))
            }
        }
    }

    /// Registers a synthetic standing for input bytes that could not be
    /// decoded. Such graphemes act as normalization terminators.
    pub fn from_codepoints_utf8_c8(codes: &[u32]) -> Self {
        let idx = THREAD_GRAPHEME_REGISTRY.with(|registry| registry.intern(codes, true));
        Grapheme::Synthetic(SyntheticId::from_registry_idx(idx))
    }

    /// Rebuilds a grapheme from its signed integer form: non-negative values
    /// are codepoints, negative values `-(index + 1)` are synthetics.
    /// Returns `None` for an index this thread never registered.
    pub fn from_inner(v: i64) -> Option<Self> {
        if v >= 0 {
            u32::try_from(v).ok().map(Grapheme::Scalar)
        } else {
            let idx = u32::try_from(-(v + 1)).ok()?;
            if THREAD_GRAPHEME_REGISTRY.with(|registry| !registry.is_valid_idx(idx)) {
                return None;
            }
            Some(Grapheme::Synthetic(SyntheticId::from_registry_idx(idx)))
        }
    }

    /// Retrieves the signed integer form of this grapheme.
    pub fn into_inner(self) -> i64 {
        match self {
            Grapheme::Scalar(cp) => i64::from(cp),
            Grapheme::Synthetic(id) => -i64::from(id.0) - 1,
        }
    }

    /// Returns whether this is the CR LF grapheme.
    pub fn is_crlf(self) -> bool {
        self == Grapheme::crlf()
    }

    /// Returns whether this is a synthetic standing for undecodable bytes.
    pub fn is_utf8_c8(self) -> bool {
        match self {
            Grapheme::Scalar(_) => false,
            Grapheme::Synthetic(id) => THREAD_GRAPHEME_REGISTRY
                .with(|registry| registry.with_synthetic(id.0, |_, _, is_utf8_c8| is_utf8_c8)),
        }
    }

    /// Retrieves the codepoint of a scalar grapheme.
    pub fn as_scalar(self) -> Option<u32> {
        match self {
            Grapheme::Scalar(cp) => Some(cp),
            Grapheme::Synthetic(_) => None,
        }
    }

    /// Retrieves the char of a scalar grapheme. Returns `None` for synthetics
    /// and for scalars that are not Unicode scalar values.
    pub fn into_char(self) -> Option<char> {
        self.as_scalar().and_then(char::from_u32)
    }

    /// Retrieves what the registry knows about a synthetic grapheme.
    pub fn synthetic_info(self) -> Option<SyntheticInfo> {
        let Grapheme::Synthetic(id) = self else {
            return None;
        };
        Some(THREAD_GRAPHEME_REGISTRY.with(|registry| {
            registry.with_synthetic(id.0, |codes, base_index, is_utf8_c8| SyntheticInfo {
                codes: codes.to_vec(),
                base_index,
                is_utf8_c8,
            })
        }))
    }

    /// The number of codepoints this grapheme stands for.
    pub fn codepoint_count(self) -> usize {
        match self {
            Grapheme::Scalar(_) => 1,
            Grapheme::Synthetic(id) => THREAD_GRAPHEME_REGISTRY
                .with(|registry| registry.with_synthetic(id.0, |codes, _, _| codes.len())),
        }
    }

    /// Retrieves an iterator over the codepoints of this grapheme.
    pub fn codepoints(self) -> Codepoints {
        match self {
            Grapheme::Scalar(cp) => Codepoints(CodepointsInner::Single(Some(cp))),
            Grapheme::Synthetic(id) if id.0 == SyntheticId::CRLF.0 => {
                let rev: CodepointVec = smallvec![CRLF_CODES[1], CRLF_CODES[0]];
                Codepoints(CodepointsInner::MultiRev(rev))
            }
            Grapheme::Synthetic(id) => {
                let rev = THREAD_GRAPHEME_REGISTRY.with(|registry| {
                    registry.with_synthetic(id.0, |codes, _, _| {
                        codes.iter().rev().copied().collect::<CodepointVec>()
                    })
                });
                Codepoints(CodepointsInner::MultiRev(rev))
            }
        }
    }

    /// Retrieves an iterator over the `char`s of this grapheme. Codepoints
    /// that are not Unicode scalar values come out as U+FFFD.
    pub fn chars(self) -> Chars {
        Chars(self.codepoints())
    }
}

impl From<char> for Grapheme {
    fn from(ch: char) -> Self {
        Grapheme::from_char(ch)
    }
}

impl fmt::Display for Grapheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.chars() {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Grapheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grapheme('{}')", self.to_string().escape_debug())
    }
}

impl PartialEq<Grapheme> for char {
    fn eq(&self, rhs: &Grapheme) -> bool {
        *rhs == *self
    }
}

impl PartialEq<char> for Grapheme {
    fn eq(&self, rhs: &char) -> bool {
        *self == Grapheme::Scalar(*rhs as u32)
    }
}

/// An iterator over the codepoints of a grapheme.
#[derive(Clone)]
pub struct Codepoints(CodepointsInner);

#[derive(Clone)]
enum CodepointsInner {
    Single(Option<u32>),
    MultiRev(CodepointVec),
}

impl fmt::Debug for Codepoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl Iterator for Codepoints {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            CodepointsInner::Single(cp) => cp.take(),
            CodepointsInner::MultiRev(rev) => rev.pop(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.0 {
            CodepointsInner::Single(cp) => usize::from(cp.is_some()),
            CodepointsInner::MultiRev(rev) => rev.len(),
        };
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Codepoints {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.0 {
            CodepointsInner::Single(cp) => cp.take(),
            CodepointsInner::MultiRev(rev) => {
                if rev.is_empty() {
                    None
                } else {
                    Some(rev.remove(0))
                }
            }
        }
    }
}

impl ExactSizeIterator for Codepoints {}

/// An iterator over the `char`s of a grapheme.
#[derive(Clone, Debug)]
pub struct Chars(Codepoints);

impl Iterator for Chars {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

impl DoubleEndedIterator for Chars {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0
            .next_back()
            .map(|cp| char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!("A", &Grapheme::from_char('A').to_string());
        assert_eq!("\r\n", &Grapheme::crlf().to_string());
        assert_eq!(
            "e\u{301}\u{302}",
            &Grapheme::from_codepoints(&[0x65, 0x301, 0x302]).to_string()
        );
        assert_eq!("\u{FFFD}", &Grapheme::Scalar(0xD800).to_string());
    }

    #[test]
    fn test_debug_fmt_grapheme() {
        assert_eq!("Grapheme('\\r\\n')", format!("{:?}", Grapheme::crlf()));
        assert_eq!("Grapheme('A')", format!("{:?}", Grapheme::from_char('A')));
        assert_eq!(
            "Grapheme('q\u{323}')",
            format!("{:?}", Grapheme::from_codepoints(&[0x71, 0x323]))
        );
        assert_eq!("Grapheme('\\u{301}')", format!("{:?}", Grapheme::Scalar(0x301)));
    }

    #[test]
    fn test_crlf() {
        assert!(Grapheme::crlf().is_crlf());
        assert_eq!(Grapheme::crlf(), Grapheme::from_codepoints(&[0x0D, 0x0A]));
        assert!(!Grapheme::from_char('\r').is_crlf());
        assert_eq!(vec![0x0D, 0x0A], Grapheme::crlf().codepoints().collect::<Vec<_>>());
    }

    #[test]
    fn test_from_codepoints_interns() {
        let a = Grapheme::from_codepoints(&[0x61, 0x301, 0x323]);
        let b = Grapheme::from_codepoints(&[0x61, 0x301, 0x323]);
        assert_eq!(a, b);
        assert_eq!(Grapheme::Scalar(0x61), Grapheme::from_codepoints(&[0x61]));
        assert_eq!(3, a.codepoint_count());
        assert_eq!(
            vec![0x323, 0x301, 0x61],
            a.codepoints().rev().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_inner_round_trip() {
        let g = Grapheme::from_codepoints(&[0x62, 0x301, 0x323]);
        assert!(g.into_inner() < 0);
        assert_eq!(Some(g), Grapheme::from_inner(g.into_inner()));
        assert_eq!(-1, Grapheme::crlf().into_inner());
        assert_eq!(Some(Grapheme::Scalar(0x41)), Grapheme::from_inner(0x41));
        assert_eq!(None, Grapheme::from_inner(-1_000_000));
    }

    #[test]
    fn test_synthetic_info() {
        assert_eq!(None, Grapheme::from_char('a').synthetic_info());
        let info = Grapheme::from_codepoints(&[0x0600, 0x0661]).synthetic_info().unwrap();
        assert_eq!(vec![0x0600, 0x0661], info.codes);
        assert_eq!(Some(1), info.base_index);
        assert!(!info.is_utf8_c8);

        let c8 = Grapheme::from_codepoints_utf8_c8(&[0x10FFFD, 0x78, 0x46, 0x46]);
        assert!(c8.is_utf8_c8());
        assert!(!Grapheme::crlf().is_utf8_c8());
    }

    #[test]
    fn test_char_comparison() {
        assert_eq!(Grapheme::from_char('x'), 'x');
        assert_eq!('x', Grapheme::from_char('x'));
        assert_ne!(Grapheme::crlf(), '\r');
    }
}
