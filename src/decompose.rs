//! Full canonical and compatibility decomposition, including the algorithmic
//! decomposition of precomposed Hangul syllables.

use crate::props::{self, DecompositionType};

pub(crate) const S_BASE: u32 = 0xAC00;
pub(crate) const L_BASE: u32 = 0x1100;
pub(crate) const V_BASE: u32 = 0x1161;
pub(crate) const T_BASE: u32 = 0x11A7;
pub(crate) const L_COUNT: u32 = 19;
pub(crate) const V_COUNT: u32 = 21;
pub(crate) const T_COUNT: u32 = 28;
pub(crate) const N_COUNT: u32 = V_COUNT * T_COUNT;
pub(crate) const S_COUNT: u32 = L_COUNT * N_COUNT;

// Mappings are fully decomposed already, so any real chain stops well before this.
const MAX_DECOMPOSITION_DEPTH: usize = 16;

#[inline]
pub(crate) fn is_hangul_syllable(cp: u32) -> bool {
    (S_BASE..S_BASE + S_COUNT).contains(&cp)
}

/// Appends the full decomposition of `cp` to `buffer`. Compatibility
/// mappings are applied only when `compat` is set; codepoints with no
/// applicable mapping are appended unchanged.
pub(crate) fn decompose_into(cp: u32, compat: bool, buffer: &mut Vec<u32>) {
    decompose_at_depth(cp, compat, buffer, 0);
}

fn decompose_at_depth(cp: u32, compat: bool, buffer: &mut Vec<u32>, depth: usize) {
    assert!(
        depth < MAX_DECOMPOSITION_DEPTH,
        "decomposition of U+{:04X} nests too deeply",
        cp
    );
    let applies = match props::decomposition_type(cp) {
        DecompositionType::None => false,
        DecompositionType::Canonical => true,
        DecompositionType::Compatibility => compat,
    };
    if !applies {
        buffer.push(cp);
        return;
    }
    match props::decomposition_mapping(cp, compat) {
        Some(mapping) => {
            for part in mapping {
                decompose_at_depth(part, compat, buffer, depth + 1);
            }
        }
        None => decompose_hangul(cp, buffer),
    }
}

fn decompose_hangul(cp: u32, buffer: &mut Vec<u32>) {
    if !is_hangul_syllable(cp) {
        buffer.push(cp);
        return;
    }
    let s_index = cp - S_BASE;
    buffer.push(L_BASE + s_index / N_COUNT);
    buffer.push(V_BASE + (s_index % N_COUNT) / T_COUNT);
    let t = T_BASE + s_index % T_COUNT;
    if t != T_BASE {
        buffer.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decompose(cp: u32, compat: bool) -> Vec<u32> {
        let mut buffer = Vec::new();
        decompose_into(cp, compat, &mut buffer);
        buffer
    }

    #[test]
    fn test_canonical() {
        assert_eq!(vec![0x41], decompose(0x41, false));
        assert_eq!(vec![0x65, 0x301], decompose(0xE9, false));
        // U+1E69 decomposes through U+1E63 to s + dot below + dot above.
        assert_eq!(vec![0x73, 0x323, 0x307], decompose(0x1E69, false));
        // Compatibility mappings stay put without `compat`.
        assert_eq!(vec![0xFB01], decompose(0xFB01, false));
    }

    #[test]
    fn test_compatibility() {
        assert_eq!(vec![0x66, 0x69], decompose(0xFB01, true));
        assert_eq!(vec![0x20], decompose(0xA0, true));
        assert_eq!(vec![0x65, 0x301], decompose(0xE9, true));
    }

    #[test]
    fn test_hangul() {
        assert_eq!(vec![0x1100, 0x1161], decompose(0xAC00, false));
        assert_eq!(vec![0x1100, 0x1161, 0x11A8], decompose(0xAC01, false));
        assert_eq!(vec![0x1112, 0x1175, 0x11C2], decompose(0xD7A3, true));
    }

    #[test]
    fn test_appends_to_existing_content() {
        let mut buffer = vec![0x61];
        decompose_into(0xC5, false, &mut buffer);
        assert_eq!(vec![0x61, 0x41, 0x30A], buffer);
    }
}
