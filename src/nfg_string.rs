use crate::grapheme_ty::{self, Grapheme};
use crate::normalizer::{codepoints_to_nfg_string, normalize_codepoints, NormalForm};
use std::{fmt, ops, slice};

/// A growable string of graphemes in NFG.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NfgString(Vec<Grapheme>);

impl PartialEq<str> for NfgString {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.chars().eq(other.chars())
    }
}

impl fmt::Display for NfgString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for g in self.0.iter() {
            write!(f, "{}", g)?;
        }
        Ok(())
    }
}

impl fmt::Debug for NfgString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        // Marks are only escaped when they start a grapheme.
        for g in self.0.iter() {
            write!(f, "{}", g.to_string().escape_debug())?;
        }
        write!(f, "\"")
    }
}

impl ops::Deref for NfgString {
    type Target = [Grapheme];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl NfgString {
    /// Creates a new empty `NfgString`.
    pub const fn new() -> Self {
        NfgString(Vec::new())
    }

    /// Normalizes `s` to NFG.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        let codes = s.chars().map(u32::from).collect::<Vec<_>>();
        codepoints_to_nfg_string(&codes)
    }

    /// Wraps graphemes that are already in NFG.
    pub fn from_graphemes(graphemes: Vec<Grapheme>) -> Self {
        NfgString(graphemes)
    }

    /// Append the given `Grapheme` to the end of the `NfgString`.
    ///
    /// No renormalization happens at the seam; pushing a lone combining mark
    /// after a base leaves them as two graphemes.
    pub fn push(&mut self, g: Grapheme) {
        self.0.push(g);
    }

    pub(crate) fn extend_from_slice(&mut self, graphemes: &[Grapheme]) {
        self.0.extend_from_slice(graphemes);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Consumes the string, returning its graphemes.
    pub fn into_graphemes(self) -> Vec<Grapheme> {
        self.0
    }

    /// Iterates over the graphemes.
    pub fn graphemes(&self) -> slice::Iter<'_, Grapheme> {
        self.0.iter()
    }

    /// Retrieves an iterator over the `char`s of all graphemes.
    pub fn chars(&self) -> Chars<'_> {
        Chars {
            graphemes: self.0.iter(),
            front: None,
        }
    }

    /// Expands synthetics and renormalizes the codepoints to `form`.
    pub fn to_codepoints(&self, form: NormalForm) -> Vec<u32> {
        let codes = self
            .0
            .iter()
            .flat_map(|g| g.codepoints())
            .collect::<Vec<_>>();
        match form {
            NormalForm::Nfc | NormalForm::Nfg => codes,
            _ => normalize_codepoints(&codes, form),
        }
    }
}

impl Extend<Grapheme> for NfgString {
    fn extend<T: IntoIterator<Item = Grapheme>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<Grapheme> for NfgString {
    fn from_iter<T: IntoIterator<Item = Grapheme>>(iter: T) -> Self {
        NfgString(iter.into_iter().collect())
    }
}

impl From<NfgString> for String {
    fn from(s: NfgString) -> Self {
        s.chars().collect()
    }
}

/// An iterator over the `char`s of an `NfgString`.
#[derive(Clone, Debug)]
pub struct Chars<'a> {
    graphemes: slice::Iter<'a, Grapheme>,
    front: Option<grapheme_ty::Chars>,
}

impl Iterator for Chars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ch) = self.front.as_mut().and_then(Iterator::next) {
                return Some(ch);
            }
            self.front = Some(self.graphemes.next()?.chars());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NfgString;
    use crate::{Grapheme, NormalForm};

    #[test]
    fn test_grapheme_count() {
        let s1 = NfgString::from_str("\u{0041}\u{0341}\u{304B}\u{3099}\u{9508}");
        assert_eq!(3, s1.len());
        // U+0341 normalizes to U+0301 and composes with A; the kana pair composes too.
        assert_eq!(3, s1.chars().count());

        let s2 = NfgString::from_str("\r\r\n\n");
        assert_eq!(3, s2.len());
        assert_eq!(4, s2.chars().count());
        assert!(s2[1].is_crlf());
    }

    #[test]
    fn test_eq_str_and_display() {
        let s = NfgString::from_str("e\u{301}q\u{323}\u{307}");
        assert_eq!(&s, "\u{E9}q\u{323}\u{307}");
        assert_eq!("\u{E9}q\u{323}\u{307}", s.to_string());
        assert_eq!("\"\u{E9}q\u{323}\u{307}\"", format!("{:?}", s));
    }

    #[test]
    fn test_debug_escapes_leading_marks_only() {
        let s = NfgString::from_str("\u{301}a\u{301}\"\r\n");
        assert_eq!(4, s.len());
        assert_eq!("\"\\u{301}\u{E1}\\\"\\r\\n\"", format!("{:?}", s));
        let marked = NfgString::from_str("q\u{323}\t");
        assert_eq!("\"q\u{323}\\t\"", format!("{:?}", marked));
    }

    #[test]
    fn test_to_codepoints() {
        let s = NfgString::from_str("\u{E9}\r\n");
        assert_eq!(vec![0xE9, 0x0D, 0x0A], s.to_codepoints(NormalForm::Nfc));
        assert_eq!(vec![0x65, 0x301, 0x0D, 0x0A], s.to_codepoints(NormalForm::Nfd));
    }

    #[test]
    fn test_collect_and_push() {
        let mut s = "ab".chars().map(Grapheme::from).collect::<NfgString>();
        s.push(Grapheme::crlf());
        assert_eq!(3, s.len());
        assert_eq!(String::from("ab\r\n"), String::from(s));
    }

    #[test]
    fn test_nfg_string_hash() {
        fn calc_hash<T: std::hash::Hash + ?Sized>(v: &T) -> u64 {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::Hasher;
            let mut hasher = DefaultHasher::new();
            v.hash(&mut hasher);
            hasher.finish()
        }

        let s = NfgString::from_str("Hello wo\u{308}rld");
        let t = NfgString::from_str("Hello w\u{F6}rld");
        assert_eq!(s, t);
        assert_eq!(calc_hash(&s), calc_hash(&t));
    }
}
