//! Character property lookups consumed by the normalizer and the grapheme
//! segmenter.
//!
//! Canonical combining classes, decomposition mappings, quick-check answers
//! and primary composites come from `unicode-normalization`; the segmentation
//! properties (Grapheme_Cluster_Break, Extended_Pictographic and
//! Indic_Conjunct_Break) come from the compiled ICU4X property data.
//!
//! Every lookup accepts any `u32`. Values that are not Unicode scalar values
//! have no properties: they read as combining class 0, no decomposition and
//! `GC_Any`.

use crate::decompose::{is_hangul_syllable, L_BASE, L_COUNT};
use icu_properties::{
    props::{ExtendedPictographic, GraphemeClusterBreak, IndicConjunctBreak},
    CodePointMapData, CodePointSetData,
};
use unicode_normalization::{
    is_nfc_quick, is_nfd_quick, is_nfkc_quick, is_nfkd_quick, IsNormalized,
};

/// First codepoint with a non-zero canonical combining class.
pub(crate) const FIRST_NONZERO_CCC: u32 = 0x300;

/// A small inline run of codepoints.
pub(crate) type CodepointVec = smallvec::SmallVec<[u32; 8]>;

/// Grapheme_Cluster_Break property values.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GraphemeCat {
    GC_Any,
    GC_CR,
    GC_Control,
    GC_Extend,
    GC_L,
    GC_LF,
    GC_LV,
    GC_LVT,
    GC_Prepend,
    GC_Regional_Indicator,
    GC_SpacingMark,
    GC_T,
    GC_V,
    GC_ZWJ,
}

/// Indic_Conjunct_Break property values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConjunctBreak {
    None,
    Consonant,
    Extend,
    Linker,
}

/// Decomposition_Type, collapsed to what the normalizer cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DecompositionType {
    None,
    Canonical,
    Compatibility,
}

/// Selects the quick-check property of one normalization form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QuickCheck {
    Nfc,
    Nfd,
    Nfkc,
    Nfkd,
}

pub(crate) fn grapheme_category(cp: u32) -> GraphemeCat {
    match CodePointMapData::<GraphemeClusterBreak>::new().get32(cp) {
        GraphemeClusterBreak::CR => GraphemeCat::GC_CR,
        GraphemeClusterBreak::LF => GraphemeCat::GC_LF,
        GraphemeClusterBreak::Control => GraphemeCat::GC_Control,
        GraphemeClusterBreak::Extend => GraphemeCat::GC_Extend,
        GraphemeClusterBreak::L => GraphemeCat::GC_L,
        GraphemeClusterBreak::LV => GraphemeCat::GC_LV,
        GraphemeClusterBreak::LVT => GraphemeCat::GC_LVT,
        GraphemeClusterBreak::T => GraphemeCat::GC_T,
        GraphemeClusterBreak::V => GraphemeCat::GC_V,
        GraphemeClusterBreak::Prepend => GraphemeCat::GC_Prepend,
        GraphemeClusterBreak::RegionalIndicator => GraphemeCat::GC_Regional_Indicator,
        GraphemeClusterBreak::SpacingMark => GraphemeCat::GC_SpacingMark,
        GraphemeClusterBreak::ZWJ => GraphemeCat::GC_ZWJ,
        _ => GraphemeCat::GC_Any,
    }
}

pub(crate) fn is_extended_pictographic(cp: u32) -> bool {
    CodePointSetData::new::<ExtendedPictographic>().contains32(cp)
}

pub(crate) fn conjunct_break(cp: u32) -> ConjunctBreak {
    match CodePointMapData::<IndicConjunctBreak>::new().get32(cp) {
        IndicConjunctBreak::Consonant => ConjunctBreak::Consonant,
        IndicConjunctBreak::Extend => ConjunctBreak::Extend,
        IndicConjunctBreak::Linker => ConjunctBreak::Linker,
        _ => ConjunctBreak::None,
    }
}

/// Canonical combining class; everything below the first combining mark
/// short-circuits to 0.
pub(crate) fn canonical_combining_class(cp: u32) -> u8 {
    if cp < FIRST_NONZERO_CCC {
        return 0;
    }
    char::from_u32(cp).map_or(0, unicode_normalization::char::canonical_combining_class)
}

/// Whether `cp` answers "yes" on the quick check. Non-scalars never pass,
/// which sends them down the slow path where they are kept as-is.
pub(crate) fn passes_quick_check(cp: u32, qc: QuickCheck) -> bool {
    let Some(ch) = char::from_u32(cp) else {
        return false;
    };
    let single = std::iter::once(ch);
    let answer = match qc {
        QuickCheck::Nfc => is_nfc_quick(single),
        QuickCheck::Nfd => is_nfd_quick(single),
        QuickCheck::Nfkc => is_nfkc_quick(single),
        QuickCheck::Nfkd => is_nfkd_quick(single),
    };
    answer == IsNormalized::Yes
}

pub(crate) fn decomposition_type(cp: u32) -> DecompositionType {
    if is_hangul_syllable(cp) {
        return DecompositionType::Canonical;
    }
    if decomposition_mapping(cp, false).is_some() {
        DecompositionType::Canonical
    } else if decomposition_mapping(cp, true).is_some() {
        DecompositionType::Compatibility
    } else {
        DecompositionType::None
    }
}

/// The decomposition mapping of `cp`, or `None` when it has no explicit one.
/// Hangul syllables never have an explicit mapping; they decompose
/// algorithmically.
pub(crate) fn decomposition_mapping(cp: u32, compat: bool) -> Option<CodepointVec> {
    if cp < 0xA0 || is_hangul_syllable(cp) {
        return None;
    }
    let ch = char::from_u32(cp)?;
    let mut mapping = CodepointVec::new();
    if compat {
        unicode_normalization::char::decompose_compatible(ch, |c| mapping.push(c as u32));
    } else {
        unicode_normalization::char::decompose_canonical(ch, |c| mapping.push(c as u32));
    }
    if mapping[..] == [cp] {
        None
    } else {
        Some(mapping)
    }
}

/// Looks up the primary composite of a starter and a following codepoint.
/// Conjoining jamo and syllables are left to the algorithmic Hangul pass.
pub(crate) fn primary_composite(starter: u32, combiner: u32) -> Option<u32> {
    if (L_BASE..L_BASE + L_COUNT).contains(&starter) || is_hangul_syllable(starter) {
        return None;
    }
    let starter = char::from_u32(starter)?;
    let combiner = char::from_u32(combiner)?;
    unicode_normalization::char::compose(starter, combiner).map(u32::from)
}
