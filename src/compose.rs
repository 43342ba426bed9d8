//! Canonical ordering and canonical composition over a region of a
//! codepoint buffer.

use crate::decompose::{
    is_hangul_syllable, L_BASE, L_COUNT, S_BASE, T_BASE, T_COUNT, V_BASE, V_COUNT,
};
use crate::props::{canonical_combining_class, primary_composite};

/// Puts `buffer[from..to]` into canonical order. Non-starters are bubbled
/// past each other by combining class; starters never move.
pub(crate) fn canonical_sort(buffer: &mut [u32], from: usize, to: usize) {
    if to <= from + 1 {
        return;
    }
    let mut reordered = true;
    while reordered {
        reordered = false;
        for i in from..to - 1 {
            let ccc_a = canonical_combining_class(buffer[i]);
            let ccc_b = canonical_combining_class(buffer[i + 1]);
            if ccc_a > ccc_b && ccc_b > 0 {
                buffer.swap(i, i + 1);
                reordered = true;
            }
        }
    }
}

/// Canonically composes `buffer[from..to]`, which must already be in
/// canonical order. Composed-away codepoints are removed from the buffer;
/// returns the new end of the region.
pub(crate) fn canonical_composition(buffer: &mut Vec<u32>, from: usize, to: usize) -> usize {
    let to = compose_primaries(buffer, from, to);
    compose_hangul(buffer, from, to)
}

fn compose_primaries(buffer: &mut Vec<u32>, from: usize, mut to: usize) -> usize {
    let mut starter: Option<usize> = None;
    let mut i = from;
    while i < to {
        let cp = buffer[i];
        let ccc = canonical_combining_class(cp);
        if let Some(s) = starter {
            // In canonical order only the immediately preceding mark can block.
            let blocked = i > s + 1 && canonical_combining_class(buffer[i - 1]) >= ccc;
            if !blocked {
                if let Some(composite) = primary_composite(buffer[s], cp) {
                    buffer[s] = composite;
                    buffer.remove(i);
                    to -= 1;
                    continue;
                }
            }
        }
        if ccc == 0 {
            starter = Some(i);
        }
        i += 1;
    }
    to
}

fn compose_hangul(buffer: &mut Vec<u32>, from: usize, mut to: usize) -> usize {
    let is_l = |cp: u32| (L_BASE..L_BASE + L_COUNT).contains(&cp);
    let is_v = |cp: u32| (V_BASE..V_BASE + V_COUNT).contains(&cp);
    let is_t = |cp: u32| (T_BASE + 1..T_BASE + T_COUNT).contains(&cp);

    let mut i = from;
    while i + 1 < to {
        let (first, second) = (buffer[i], buffer[i + 1]);
        if is_l(first) && is_v(second) {
            let lv = S_BASE + ((first - L_BASE) * V_COUNT + (second - V_BASE)) * T_COUNT;
            if i + 2 < to && is_t(buffer[i + 2]) {
                buffer[i] = lv + (buffer[i + 2] - T_BASE);
                buffer.drain(i + 1..i + 3);
                to -= 2;
            } else {
                buffer[i] = lv;
                buffer.remove(i + 1);
                to -= 1;
            }
        } else if is_hangul_syllable(first) && (first - S_BASE) % T_COUNT == 0 && is_t(second) {
            buffer[i] = first + (second - T_BASE);
            buffer.remove(i + 1);
            to -= 1;
        }
        i += 1;
    }
    to
}
