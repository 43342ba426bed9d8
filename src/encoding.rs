//! Byte decoders feeding a [`DecodeStream`](crate::DecodeStream).

use crate::utf8::Utf8Decoder;
use encoding_rs::WINDOWS_1252;
use std::fmt;

/// What a decoder made of one more byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderStep {
    /// The byte was consumed but does not finish a codepoint yet.
    Pending,
    /// The byte finished a codepoint.
    Codepoint(u32),
    /// The input is malformed here. With `reprocess` set, the byte that
    /// revealed the problem was not consumed and must be fed again after
    /// dealing with the error.
    Malformed {
        /// Whether the current byte must be fed again.
        reprocess: bool,
    },
}

/// A push-style decoder turning bytes into codepoints one byte at a time.
pub trait ByteDecoder: fmt::Debug {
    /// Name used in error messages.
    fn name(&self) -> &'static str;

    /// Feeds one byte.
    fn decode_byte(&mut self, byte: u8) -> DecoderStep;

    /// Whether the decoder is in the middle of a multi-byte sequence.
    fn in_sequence(&self) -> bool {
        false
    }

    /// Forgets any partially decoded sequence.
    fn reset(&mut self) {}
}

/// The encodings a decode stream can be set up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8; a leading byte order mark is skipped.
    Utf8,
    /// 7-bit ASCII.
    Ascii,
    /// ISO-8859-1, mapping every byte to the codepoint of the same value.
    Latin1,
    /// Windows code page 1252.
    Windows1252,
}

impl Encoding {
    /// Creates a decoder for this encoding. `permissive` lets Windows-1252
    /// pass its five unassigned bytes through as C1 controls.
    pub fn decoder(self, permissive: bool) -> Box<dyn ByteDecoder> {
        match self {
            Encoding::Utf8 => Box::new(Utf8Decoder::new()),
            Encoding::Ascii => Box::new(AsciiDecoder),
            Encoding::Latin1 => Box::new(Latin1Decoder),
            Encoding::Windows1252 => Box::new(Windows1252Decoder { permissive }),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "iso-8859-1",
            Encoding::Windows1252 => "windows-1252",
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct AsciiDecoder;

impl ByteDecoder for AsciiDecoder {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn decode_byte(&mut self, byte: u8) -> DecoderStep {
        if byte.is_ascii() {
            DecoderStep::Codepoint(u32::from(byte))
        } else {
            DecoderStep::Malformed { reprocess: false }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Latin1Decoder;

impl ByteDecoder for Latin1Decoder {
    fn name(&self) -> &'static str {
        "iso-8859-1"
    }

    fn decode_byte(&mut self, byte: u8) -> DecoderStep {
        DecoderStep::Codepoint(u32::from(byte))
    }
}

/// Bytes windows-1252 leaves unassigned. The WHATWG mapping passes them
/// through as C1 controls, which only permissive mode accepts.
const WINDOWS_1252_UNASSIGNED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

#[derive(Clone, Copy, Debug)]
struct Windows1252Decoder {
    permissive: bool,
}

impl ByteDecoder for Windows1252Decoder {
    fn name(&self) -> &'static str {
        WINDOWS_1252.name()
    }

    fn decode_byte(&mut self, byte: u8) -> DecoderStep {
        if byte < 0x80 {
            return DecoderStep::Codepoint(u32::from(byte));
        }
        if !self.permissive && WINDOWS_1252_UNASSIGNED.contains(&byte) {
            return DecoderStep::Malformed { reprocess: false };
        }
        let bytes = [byte];
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(&bytes);
        match text.chars().next() {
            Some(ch) => DecoderStep::Codepoint(u32::from(ch)),
            None => DecoderStep::Malformed { reprocess: false },
        }
    }
}
