#![deny(unsafe_op_in_unsafe_fn)]
#![deny(missing_docs, missing_debug_implementations)]
//! Grapheme-aware Unicode normalization and incremental text decoding.
//!
//! The `Normalizer` type turns a stream of codepoints into one of the Unicode normal forms NFD,
//! NFKD, NFC or NFKC, or into NFG. NFG is NFC where every extended grapheme cluster (as defined
//! within UAX-29) is a single `Grapheme`. Graphemes that consist of two or more codepoints are
//! registered as synthetics on a per-thread basis, so each distinct cluster gets a stable id for
//! the lifetime of the thread. This also means that `Grapheme`s are neither `Send` nor `Sync`.
//!
//! The `NfgString` type is a growable string of graphemes in NFG.
//!
//! The `DecodeStream` type decodes byte buffers that arrive piecemeal (UTF-8, ASCII, Latin-1 or
//! Windows-1252) straight into NFG, handing out graphemes by count, up to a separator, or all at
//! once.
//!
//! # Streaming
//!
//! The normalizer only hands out a grapheme once nothing that may still arrive can change it: a
//! combining mark can reorder or compose with what came before it, and most grapheme cluster
//! rules look ahead. Feeding the same codepoints in any number of pieces yields the same output
//! as feeding them in one go, as long as `eof` is signalled at the end.
//!
//! # Newlines
//!
//! In NFG, CR LF is a single grapheme even when the CR and the LF arrive in separate buffers.
//! With newline translation enabled it becomes a lone LF instead.

pub(crate) mod props;

pub(crate) mod decompose;

pub(crate) mod compose;

pub(crate) mod segment;

pub(crate) mod grapheme_registry;

pub(crate) mod grapheme_ty;

pub(crate) mod normalizer;

pub(crate) mod nfg_string;

pub(crate) mod utf8;

pub(crate) mod encoding;

pub(crate) mod decode_stream;

pub(crate) mod error;

pub use grapheme_ty::{Chars as GraphemeChars, Codepoints, Grapheme, SyntheticId, SyntheticInfo};

pub use nfg_string::{Chars, NfgString};

pub use normalizer::{
    codepoints_to_nfg_string, normalize_codepoints, normalize_str, NormalForm, Normalizer,
};

pub use decode_stream::{DecodeStream, DecodeStreamConfig, Separators};

pub use encoding::{ByteDecoder, DecoderStep, Encoding};

pub use utf8::Utf8Decoder;

pub use error::{DecodeError, InvalidFormError};
