//! Strict, incremental UTF-8 decoding: overlong forms, surrogates and
//! values past U+10FFFF are all malformed.

use crate::encoding::{ByteDecoder, DecoderStep};

pub(crate) const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

const TAG_TWO_B: u8 = 0b1100_0000;
const TAG_THREE_B: u8 = 0b1110_0000;
const TAG_FOUR_B: u8 = 0b1111_0000;
const CONT_VALUE_MASK: u8 = 0b0011_1111;

const CONT_MIN: u8 = 0x80;
const CONT_MAX: u8 = 0xBF;

/// Incremental UTF-8 decoder state.
#[derive(Clone, Debug, Default)]
pub struct Utf8Decoder {
    value: u32,
    needed: u8,
    lower: u8,
    upper: u8,
}

impl Utf8Decoder {
    /// Creates a decoder positioned at a sequence boundary.
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&mut self, value: u8, needed: u8, lower: u8, upper: u8) -> DecoderStep {
        self.value = u32::from(value);
        self.needed = needed;
        self.lower = lower;
        self.upper = upper;
        DecoderStep::Pending
    }
}

impl ByteDecoder for Utf8Decoder {
    fn name(&self) -> &'static str {
        "utf-8"
    }

    fn decode_byte(&mut self, byte: u8) -> DecoderStep {
        if self.needed == 0 {
            return match byte {
                0x00..=0x7F => DecoderStep::Codepoint(u32::from(byte)),
                0xC2..=0xDF => self.start(byte & !TAG_TWO_B, 1, CONT_MIN, CONT_MAX),
                0xE0 => self.start(byte & !TAG_THREE_B, 2, 0xA0, CONT_MAX),
                0xED => self.start(byte & !TAG_THREE_B, 2, CONT_MIN, 0x9F),
                0xE1..=0xEF => self.start(byte & !TAG_THREE_B, 2, CONT_MIN, CONT_MAX),
                0xF0 => self.start(byte & !TAG_FOUR_B, 3, 0x90, CONT_MAX),
                0xF4 => self.start(byte & !TAG_FOUR_B, 3, CONT_MIN, 0x8F),
                0xF1..=0xF3 => self.start(byte & !TAG_FOUR_B, 3, CONT_MIN, CONT_MAX),
                _ => DecoderStep::Malformed { reprocess: false },
            };
        }
        if !(self.lower..=self.upper).contains(&byte) {
            // The sequence is cut short; the byte itself may start a new one.
            self.reset();
            return DecoderStep::Malformed { reprocess: true };
        }
        self.value = (self.value << 6) | u32::from(byte & CONT_VALUE_MASK);
        self.lower = CONT_MIN;
        self.upper = CONT_MAX;
        self.needed -= 1;
        if self.needed == 0 {
            DecoderStep::Codepoint(self.value)
        } else {
            DecoderStep::Pending
        }
    }

    fn in_sequence(&self) -> bool {
        self.needed != 0
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
