//! Incremental decoding of byte buffers into NFG graphemes.
//!
//! A [`DecodeStream`] owns a queue of byte buffers added by the caller and a
//! queue of decoded grapheme buffers waiting to be claimed. Extraction calls
//! decode only as much as they need and report `Ok(None)` when the queued
//! bytes are not enough yet; the caller is expected to add more bytes and
//! retry, or use one of the `_eof` variants once no more input will come.

use crate::encoding::{ByteDecoder, DecoderStep, Encoding};
use crate::error::DecodeError;
use crate::normalizer::{NormalForm, Normalizer};
use crate::utf8::BOM;
use crate::{Grapheme, NfgString};
use smallvec::SmallVec;
use std::{collections::VecDeque, mem};
use tracing::{debug, trace};

type SeparatorVec = SmallVec<[Grapheme; 2]>;

/// One or more separators, each a non-empty sequence of graphemes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Separators {
    seps: Vec<SeparatorVec>,
    final_graphemes: SmallVec<[Grapheme; 4]>,
    max_length: usize,
}

impl Separators {
    /// Builds a separator set.
    ///
    /// # Panics
    ///
    /// Panics if there are no separators or one of them is empty.
    pub fn new<I, S>(seps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = Grapheme>,
    {
        let seps = seps
            .into_iter()
            .map(|sep| sep.into_iter().collect::<SeparatorVec>())
            .collect::<Vec<_>>();
        assert!(!seps.is_empty(), "at least one separator is required");
        let mut final_graphemes = SmallVec::new();
        let mut max_length = 0;
        for sep in seps.iter() {
            let last = *sep.last().expect("separators cannot be empty");
            if !final_graphemes.contains(&last) {
                final_graphemes.push(last);
            }
            max_length = max_length.max(sep.len());
        }
        Separators {
            seps,
            final_graphemes,
            max_length,
        }
    }

    /// A single one-grapheme separator.
    pub fn single(g: Grapheme) -> Self {
        Separators::new([[g]])
    }

    /// Line endings: LF and the CR LF grapheme.
    pub fn lines() -> Self {
        Separators::new([[Grapheme::from_char('\n')], [Grapheme::crlf()]])
    }

    /// Separators given as strings, each normalized to NFG.
    pub fn from_strs(seps: &[&str]) -> Self {
        Separators::new(seps.iter().map(|s| NfgString::from_str(s).into_graphemes()))
    }

    /// Length in graphemes of the longest separator.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn is_final_grapheme(&self, g: Grapheme) -> bool {
        self.final_graphemes.contains(&g)
    }

    /// Length of the longest separator `window` ends with.
    fn match_len(&self, window: &VecDeque<Grapheme>) -> Option<usize> {
        self.seps
            .iter()
            .filter(|sep| {
                sep.len() <= window.len()
                    && window.iter().skip(window.len() - sep.len()).eq(sep.iter())
            })
            .map(|sep| sep.len())
            .max()
    }
}

/// Settings for a [`DecodeStream`].
#[derive(Clone, Debug)]
pub struct DecodeStreamConfig {
    /// Encoding of the incoming bytes.
    pub encoding: Encoding,
    /// Absolute position of the first byte that will be added.
    pub abs_byte_pos: u64,
    /// Turn CR LF into a lone LF.
    pub translate_newlines: bool,
    /// Substituted for malformed input instead of reporting an error.
    pub replacement: Option<String>,
    /// Let Windows-1252 pass its unassigned bytes through.
    pub permissive: bool,
    /// Capacity of each decoded grapheme buffer.
    pub result_size_guess: usize,
}

impl Default for DecodeStreamConfig {
    fn default() -> Self {
        DecodeStreamConfig {
            encoding: Encoding::Utf8,
            abs_byte_pos: 0,
            translate_newlines: false,
            replacement: None,
            permissive: false,
            result_size_guess: 64,
        }
    }
}

impl DecodeStreamConfig {
    /// Sets the encoding.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the absolute position of the first byte.
    pub fn with_abs_byte_pos(mut self, abs_byte_pos: u64) -> Self {
        self.abs_byte_pos = abs_byte_pos;
        self
    }

    /// Enables CR LF to LF translation.
    pub fn with_translate_newlines(mut self, translate_newlines: bool) -> Self {
        self.translate_newlines = translate_newlines;
        self
    }

    /// Sets the replacement for malformed input.
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Sets permissive decoding.
    pub fn with_permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Sets the decoded buffer capacity.
    pub fn with_result_size_guess(mut self, result_size_guess: usize) -> Self {
        self.result_size_guess = result_size_guess;
        self
    }
}

/// What a decode run is trying to reach.
#[derive(Clone, Copy, Debug)]
enum Stopper<'a> {
    Exhaust,
    Chars(usize),
    Separators(&'a Separators),
}

impl Stopper<'_> {
    fn is_reached(&self, g: Grapheme, produced: usize) -> bool {
        match self {
            Stopper::Exhaust => false,
            Stopper::Chars(wanted) => produced >= *wanted,
            Stopper::Separators(seps) => seps.is_final_grapheme(g),
        }
    }
}

/// Progress of the separator search over the unclaimed graphemes, so a
/// search that resumes after more decoding only looks at new graphemes.
#[derive(Debug, Default)]
struct SeparatorScan {
    seps: Option<Separators>,
    scanned: usize,
    window: VecDeque<Grapheme>,
}

/// Pull-based bytes-to-graphemes decoder.
#[derive(Debug)]
pub struct DecodeStream {
    bytes: VecDeque<Vec<u8>>,
    bytes_head_pos: usize,
    chars: VecDeque<Vec<Grapheme>>,
    chars_head_pos: usize,
    abs_byte_pos: u64,
    decoder: Box<dyn ByteDecoder>,
    norm: Normalizer,
    replacement: Option<Vec<u32>>,
    skip_bom: bool,
    result_size_guess: usize,
    sep_scan: SeparatorScan,
}

impl Default for DecodeStream {
    fn default() -> Self {
        DecodeStream::new(DecodeStreamConfig::default())
    }
}

impl DecodeStream {
    /// Creates an empty stream.
    pub fn new(config: DecodeStreamConfig) -> Self {
        let decoder = config.encoding.decoder(config.permissive);
        let skip_bom = config.encoding == Encoding::Utf8 && config.abs_byte_pos == 0;
        let mut stream = DecodeStream::with_decoder(config, decoder);
        stream.skip_bom = skip_bom;
        stream
    }

    /// Creates an empty stream around a caller-supplied decoder. The
    /// configured encoding is ignored and no byte order mark is skipped.
    pub fn with_decoder(config: DecodeStreamConfig, decoder: Box<dyn ByteDecoder>) -> Self {
        trace!(
            decoder = decoder.name(),
            abs_byte_pos = config.abs_byte_pos,
            "creating decode stream"
        );
        let mut norm = Normalizer::new(NormalForm::Nfg);
        if config.translate_newlines {
            norm.translate_newlines();
        }
        DecodeStream {
            bytes: VecDeque::new(),
            bytes_head_pos: 0,
            chars: VecDeque::new(),
            chars_head_pos: 0,
            abs_byte_pos: config.abs_byte_pos,
            decoder,
            norm,
            replacement: config
                .replacement
                .map(|s| s.chars().map(u32::from).collect()),
            skip_bom: false,
            result_size_guess: config.result_size_guess.max(1),
            sep_scan: SeparatorScan::default(),
        }
    }

    /// Queues a buffer of bytes. Empty buffers are ignored.
    pub fn add_bytes(&mut self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        self.bytes.push_back(bytes);
    }

    /// Queues already decoded graphemes behind those decoded so far.
    pub fn add_chars(&mut self, chars: Vec<Grapheme>) {
        if chars.is_empty() {
            return;
        }
        self.chars.push_back(chars);
    }

    /// Takes exactly `n` graphemes, decoding queued bytes as needed.
    /// Returns `Ok(None)` if the queued input cannot provide that many yet.
    pub fn get_chars(&mut self, n: usize) -> Result<Option<NfgString>, DecodeError> {
        let available = self.chars_available();
        if available < n {
            self.run_decode(Stopper::Chars(n - available), false)?;
        }
        if self.chars_available() < n {
            return Ok(None);
        }
        Ok(Some(self.take_chars(n)))
    }

    /// Like [`get_chars`](Self::get_chars), but treats the queued input as
    /// all there is and returns fewer graphemes if that is all that is left.
    /// Returns `Ok(None)` once nothing at all is left.
    pub fn get_chars_eof(&mut self, n: usize) -> Result<Option<NfgString>, DecodeError> {
        let available = self.chars_available();
        if available < n {
            self.run_decode(Stopper::Chars(n - available), true)?;
        }
        let take = n.min(self.chars_available());
        if take == 0 {
            return Ok(None);
        }
        Ok(Some(self.take_chars(take)))
    }

    /// Takes graphemes up to and including the next `sep`.
    pub fn get_until_separator(&mut self, sep: Grapheme) -> Result<Option<NfgString>, DecodeError> {
        self.get_until_sep(&Separators::single(sep), false)
    }

    /// Takes graphemes up to and including the next separator; with `chomp`
    /// the separator itself is dropped from the result. Returns `Ok(None)`
    /// if no separator is in the queued input yet.
    pub fn get_until_sep(
        &mut self,
        seps: &Separators,
        chomp: bool,
    ) -> Result<Option<NfgString>, DecodeError> {
        loop {
            if let Some((count, sep_len)) = self.find_separator(seps) {
                return Ok(Some(self.take_line(count, sep_len, chomp)));
            }
            if !self.run_decode(Stopper::Separators(seps), false)? {
                return Ok(None);
            }
        }
    }

    /// Like [`get_until_sep`](Self::get_until_sep), but treats the queued
    /// input as all there is: a final line without separator is returned
    /// as-is. Returns `Ok(None)` once nothing at all is left.
    pub fn get_until_sep_eof(
        &mut self,
        seps: &Separators,
        chomp: bool,
    ) -> Result<Option<NfgString>, DecodeError> {
        if let Some(line) = self.get_until_sep(seps, chomp)? {
            return Ok(Some(line));
        }
        self.run_decode(Stopper::Separators(seps), true)?;
        if let Some((count, sep_len)) = self.find_separator(seps) {
            return Ok(Some(self.take_line(count, sep_len, chomp)));
        }
        let remaining = self.chars_available();
        if remaining == 0 {
            return Ok(None);
        }
        Ok(Some(self.take_chars(remaining)))
    }

    /// Decodes everything queued, flushes the normalizer and takes every
    /// remaining grapheme.
    pub fn get_all(&mut self) -> Result<NfgString, DecodeError> {
        self.run_decode(Stopper::Exhaust, true)?;
        Ok(self.take_all())
    }

    /// Decodes everything queued and takes every grapheme that is final
    /// without flushing the normalizer.
    pub fn get_available(&mut self) -> Result<NfgString, DecodeError> {
        self.run_decode(Stopper::Exhaust, false)?;
        Ok(self.take_all())
    }

    /// Number of queued bytes not consumed yet.
    pub fn bytes_available(&self) -> usize {
        self.bytes.iter().map(Vec::len).sum::<usize>() - self.bytes_head_pos
    }

    /// Whether at least `n` undecoded bytes are queued.
    pub fn have_bytes(&self, n: usize) -> bool {
        self.bytes_available() >= n
    }

    /// Takes up to `n` raw bytes from the front of the byte queue.
    pub fn bytes_to_buf(&mut self, n: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(n.min(self.bytes_available()));
        while buf.len() < n {
            let Some(head) = self.bytes.front() else {
                break;
            };
            let take = (head.len() - self.bytes_head_pos).min(n - buf.len());
            buf.extend_from_slice(&head[self.bytes_head_pos..self.bytes_head_pos + take]);
            self.discard_to(0, self.bytes_head_pos + take);
        }
        buf
    }

    /// Drops every byte buffer before queue index `chunk` and moves the head
    /// of that buffer to `pos`, dropping it too when `pos` reaches its end.
    /// A `pos` behind the current head of the first buffer moves nothing.
    pub fn discard_to(&mut self, chunk: usize, pos: usize) {
        for _ in 0..chunk {
            if let Some(bytes) = self.bytes.pop_front() {
                self.abs_byte_pos += (bytes.len() - self.bytes_head_pos) as u64;
                self.bytes_head_pos = 0;
            }
        }
        let Some(head_len) = self.bytes.front().map(Vec::len) else {
            return;
        };
        let pos = pos.max(self.bytes_head_pos);
        if pos >= head_len {
            self.abs_byte_pos += (head_len - self.bytes_head_pos) as u64;
            self.bytes.pop_front();
            self.bytes_head_pos = 0;
        } else {
            self.abs_byte_pos += (pos - self.bytes_head_pos) as u64;
            self.bytes_head_pos = pos;
        }
        trace!(abs_byte_pos = self.abs_byte_pos, "discarded decoded bytes");
    }

    /// Absolute position just past the last byte consumed by decoding.
    pub fn tell_bytes(&self) -> u64 {
        self.abs_byte_pos
    }

    /// Whether no bytes, no decoded graphemes and no normalizer state remain.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.chars.is_empty() && self.norm.is_empty()
    }

    fn chars_available(&self) -> usize {
        self.chars.iter().map(Vec::len).sum::<usize>() - self.chars_head_pos
    }

    fn take_chars(&mut self, n: usize) -> NfgString {
        if n > 0 {
            self.sep_scan.scanned = 0;
            self.sep_scan.window.clear();
        }
        if self.chars_head_pos == 0 && self.chars.front().map_or(false, |buf| buf.len() == n) {
            if let Some(buf) = self.chars.pop_front() {
                return NfgString::from_graphemes(buf);
            }
        }
        let mut result = NfgString::from_graphemes(Vec::with_capacity(n));
        let mut needed = n;
        while needed > 0 {
            let Some(head) = self.chars.front() else {
                break;
            };
            let available = head.len() - self.chars_head_pos;
            let take = available.min(needed);
            result.extend_from_slice(&head[self.chars_head_pos..self.chars_head_pos + take]);
            needed -= take;
            if take == available {
                self.chars.pop_front();
                self.chars_head_pos = 0;
            } else {
                self.chars_head_pos += take;
            }
        }
        result
    }

    fn take_all(&mut self) -> NfgString {
        let n = self.chars_available();
        self.take_chars(n)
    }

    fn take_line(&mut self, count: usize, sep_len: usize, chomp: bool) -> NfgString {
        let mut line = self.take_chars(count);
        if chomp {
            line.truncate(count - sep_len);
        }
        line
    }

    /// Graphemes up to and including the first separator, and that
    /// separator's length. Picks up where the previous search with the same
    /// separators stopped.
    fn find_separator(&mut self, seps: &Separators) -> Option<(usize, usize)> {
        if self.sep_scan.seps.as_ref() != Some(seps) {
            self.sep_scan = SeparatorScan {
                seps: Some(seps.clone()),
                scanned: 0,
                window: VecDeque::with_capacity(seps.max_length()),
            };
        }
        let scan = &mut self.sep_scan;
        let mut skip = scan.scanned;
        for (i, buf) in self.chars.iter().enumerate() {
            let from = if i == 0 { self.chars_head_pos } else { 0 };
            let unclaimed = &buf[from..];
            if skip >= unclaimed.len() {
                skip -= unclaimed.len();
                continue;
            }
            for &g in &unclaimed[skip..] {
                scan.scanned += 1;
                if scan.window.len() == seps.max_length() {
                    scan.window.pop_front();
                }
                scan.window.push_back(g);
                if seps.is_final_grapheme(g) {
                    if let Some(sep_len) = seps.match_len(&scan.window) {
                        return Some((scan.scanned, sep_len));
                    }
                }
            }
            skip = 0;
        }
        None
    }

    fn peek_bytes(&self, n: usize) -> SmallVec<[u8; 4]> {
        self.bytes
            .iter()
            .enumerate()
            .flat_map(|(i, buf)| {
                let from = if i == 0 { self.bytes_head_pos } else { 0 };
                buf[from..].iter().copied()
            })
            .take(n)
            .collect()
    }

    /// Drops a byte order mark at the very start of the input. Returns false
    /// while too few bytes are queued to tell.
    fn strip_bom(&mut self, eof: bool) -> bool {
        if self.abs_byte_pos != 0 {
            self.skip_bom = false;
            return true;
        }
        let head = self.peek_bytes(BOM.len());
        if head.len() < BOM.len() && BOM.starts_with(&head) && !eof {
            return false;
        }
        self.skip_bom = false;
        if head[..] == BOM {
            debug!("skipping utf-8 byte order mark");
            self.bytes_to_buf(BOM.len());
        }
        true
    }

    fn flush_chars(&mut self, out: Vec<Grapheme>) {
        if !out.is_empty() {
            self.chars.push_back(out);
        }
    }

    fn emit(
        &mut self,
        out: &mut Vec<Grapheme>,
        g: Grapheme,
        produced: &mut usize,
        stopper: Stopper<'_>,
    ) -> bool {
        if out.len() == self.result_size_guess {
            let full = mem::replace(out, Vec::with_capacity(self.result_size_guess));
            self.chars.push_back(full);
        }
        out.push(g);
        *produced += 1;
        stopper.is_reached(g, *produced)
    }

    /// Feeds one codepoint to the normalizer and moves whatever it finishes
    /// into `out`, stopping as soon as `stopper` is reached. Graphemes past
    /// the stopper stay in the normalizer.
    fn feed(
        &mut self,
        cp: u32,
        out: &mut Vec<Grapheme>,
        produced: &mut usize,
        stopper: Stopper<'_>,
    ) -> bool {
        let Some((g, ready)) = self.norm.process_codepoint(cp) else {
            return false;
        };
        let mut reached = self.emit(out, g, produced, stopper);
        for _ in 1..ready {
            if reached {
                break;
            }
            let g = self.norm.get_grapheme();
            reached = self.emit(out, g, produced, stopper);
        }
        reached
    }

    fn feed_all(
        &mut self,
        codes: &[u32],
        out: &mut Vec<Grapheme>,
        produced: &mut usize,
        stopper: Stopper<'_>,
    ) -> bool {
        let mut reached = false;
        for &cp in codes {
            reached |= self.feed(cp, out, produced, stopper);
        }
        reached
    }

    /// Decodes queued bytes until `stopper` is reached or the bytes run out;
    /// with `eof` the normalizer is flushed at the end. Returns whether the
    /// stopper was reached. Bytes are discarded up to the end of the last
    /// complete codepoint, so a sequence split across `add_bytes` calls is
    /// decoded again from its start on the next run. On error, the bad bytes
    /// are discarded too and everything decoded before them is kept.
    fn run_decode(&mut self, stopper: Stopper<'_>, eof: bool) -> Result<bool, DecodeError> {
        trace!(
            ?stopper,
            eof,
            bytes = self.bytes_available(),
            "starting decode run"
        );
        let mut out = Vec::with_capacity(self.result_size_guess);
        let mut produced = 0;

        while self.norm.available() > 0 {
            let g = self.norm.get_grapheme();
            if self.emit(&mut out, g, &mut produced, stopper) {
                self.flush_chars(out);
                return Ok(true);
            }
        }

        if self.skip_bom && !self.strip_bom(eof) {
            self.flush_chars(out);
            return Ok(false);
        }

        self.decoder.reset();
        let start_abs = self.abs_byte_pos;
        let mut accepted = (0, self.bytes_head_pos);
        let mut accepted_walked = 0u64;
        let mut walked = 0u64;
        let mut reached = false;
        let mut chunk = 0;
        let mut pos = self.bytes_head_pos;
        'chunks: while chunk < self.bytes.len() {
            while pos < self.bytes[chunk].len() {
                let byte = self.bytes[chunk][pos];
                pos += 1;
                walked += 1;
                match self.decoder.decode_byte(byte) {
                    DecoderStep::Pending => {}
                    DecoderStep::Codepoint(cp) => {
                        accepted = (chunk, pos);
                        accepted_walked = walked;
                        if self.feed(cp, &mut out, &mut produced, stopper) {
                            reached = true;
                            break 'chunks;
                        }
                    }
                    DecoderStep::Malformed { reprocess } => {
                        if reprocess {
                            pos -= 1;
                            walked -= 1;
                        }
                        let offset = start_abs + accepted_walked;
                        let Some(replacement) = self.replacement.take() else {
                            debug!(offset, decoder = self.decoder.name(), "malformed input");
                            self.decoder.reset();
                            self.flush_chars(out);
                            self.discard_to(chunk, pos);
                            return Err(DecodeError::Malformed {
                                encoding: self.decoder.name(),
                                offset,
                            });
                        };
                        trace!(offset, "substituting replacement for malformed input");
                        self.decoder.reset();
                        accepted = (chunk, pos);
                        accepted_walked = walked;
                        reached = self.feed_all(&replacement, &mut out, &mut produced, stopper);
                        self.replacement = Some(replacement);
                        if reached {
                            break 'chunks;
                        }
                    }
                }
            }
            chunk += 1;
            pos = 0;
        }

        if eof && !reached {
            if self.decoder.in_sequence() {
                let offset = start_abs + accepted_walked;
                let Some(replacement) = self.replacement.take() else {
                    debug!(offset, decoder = self.decoder.name(), "incomplete input at eof");
                    self.decoder.reset();
                    self.flush_chars(out);
                    self.discard_to(self.bytes.len(), 0);
                    return Err(DecodeError::Incomplete {
                        encoding: self.decoder.name(),
                        offset,
                    });
                };
                self.decoder.reset();
                accepted = (self.bytes.len(), 0);
                reached = self.feed_all(&replacement, &mut out, &mut produced, stopper);
                self.replacement = Some(replacement);
            }
            if !reached {
                self.norm.eof();
                while self.norm.available() > 0 {
                    let g = self.norm.get_grapheme();
                    if self.emit(&mut out, g, &mut produced, stopper) {
                        reached = true;
                        break;
                    }
                }
            }
        }

        self.flush_chars(out);
        self.discard_to(accepted.0, accepted.1);
        trace!(produced, reached, "finished decode run");
        Ok(reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utf8_stream() -> DecodeStream {
        DecodeStream::new(DecodeStreamConfig::default())
    }

    #[test]
    fn test_crlf_split_across_buffers() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"A\r".to_vec());
        ds.add_bytes(b"\nB".to_vec());
        let line = ds.get_until_separator(Grapheme::crlf()).unwrap().unwrap();
        assert_eq!(2, line.len());
        assert_eq!(Grapheme::from_char('A'), line[0]);
        assert!(line[1].is_crlf());
        assert_eq!(3, ds.tell_bytes());
        assert_eq!(1, ds.bytes_available());
        assert_eq!("B", ds.get_all().unwrap().to_string());
        assert!(ds.is_empty());
    }

    #[test]
    fn test_get_chars_waits_for_input() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"abc".to_vec());
        assert_eq!(None, ds.get_chars(5).unwrap());
        ds.add_bytes(b"defg".to_vec());
        assert_eq!("abcde", ds.get_chars(5).unwrap().unwrap().to_string());
        assert_eq!("fg", ds.get_all().unwrap().to_string());
    }

    #[test]
    fn test_get_chars_eof_returns_short_tail() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"xyz".to_vec());
        assert_eq!("xy", ds.get_chars_eof(2).unwrap().unwrap().to_string());
        assert_eq!("z", ds.get_chars_eof(2).unwrap().unwrap().to_string());
        assert_eq!(None, ds.get_chars_eof(2).unwrap());
    }

    #[test]
    fn test_multibyte_split_across_buffers() {
        let bytes = "\u{1F600}\u{E9}".as_bytes();
        let mut ds = utf8_stream();
        ds.add_bytes(bytes[..2].to_vec());
        assert_eq!(None, ds.get_chars(1).unwrap());
        assert_eq!(0, ds.tell_bytes());
        ds.add_bytes(bytes[2..5].to_vec());
        ds.add_bytes(bytes[5..].to_vec());
        let all = ds.get_all().unwrap();
        assert_eq!(&all, "\u{1F600}\u{E9}");
        assert_eq!(6, ds.tell_bytes());
    }

    #[test]
    fn test_marks_across_buffers_compose() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"e".to_vec());
        assert_eq!(0, ds.get_available().unwrap().len());
        ds.add_bytes("\u{301}\n".as_bytes().to_vec());
        let line = ds.get_until_sep(&Separators::lines(), true).unwrap().unwrap();
        assert_eq!(&line, "\u{E9}");
    }

    #[test]
    fn test_lines_with_chomp() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"one\r\ntwo\nthree".to_vec());
        let seps = Separators::lines();
        assert_eq!("one", ds.get_until_sep(&seps, true).unwrap().unwrap().to_string());
        assert_eq!("two\n", ds.get_until_sep(&seps, false).unwrap().unwrap().to_string());
        assert_eq!(None, ds.get_until_sep(&seps, true).unwrap());
        assert_eq!("three", ds.get_until_sep_eof(&seps, true).unwrap().unwrap().to_string());
        assert_eq!(None, ds.get_until_sep_eof(&seps, true).unwrap());
    }

    #[test]
    fn test_multi_grapheme_separator() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"a--b-c--d".to_vec());
        let seps = Separators::from_strs(&["--"]);
        assert_eq!(2, seps.max_length());
        assert_eq!("a--", ds.get_until_sep(&seps, false).unwrap().unwrap().to_string());
        assert_eq!("b-c", ds.get_until_sep(&seps, true).unwrap().unwrap().to_string());
    }

    #[test]
    fn test_translate_newlines() {
        let mut ds = DecodeStream::new(DecodeStreamConfig::default().with_translate_newlines(true));
        ds.add_bytes(b"a\r\nb".to_vec());
        let all = ds.get_all().unwrap();
        assert_eq!(&all, "a\nb");
    }

    #[test]
    fn test_bom_is_skipped_at_start_only() {
        let mut ds = utf8_stream();
        ds.add_bytes(vec![0xEF, 0xBB]);
        assert_eq!(None, ds.get_chars(1).unwrap());
        ds.add_bytes(vec![0xBF, b'x']);
        assert_eq!("x", ds.get_all().unwrap().to_string());
        assert_eq!(4, ds.tell_bytes());

        let mut ds = DecodeStream::new(DecodeStreamConfig::default().with_abs_byte_pos(10));
        ds.add_bytes("\u{FEFF}x".as_bytes().to_vec());
        assert_eq!("\u{FEFF}x", ds.get_all().unwrap().to_string());
    }

    #[test]
    fn test_malformed_utf8_reports_offset() {
        let mut ds = utf8_stream();
        ds.add_bytes(vec![b'o', b'k', 0xFF, b'!']);
        assert_eq!(
            Err(DecodeError::Malformed {
                encoding: "utf-8",
                offset: 2
            }),
            ds.get_all()
        );
        // The bad byte is skipped; what came before it is kept.
        assert_eq!(3, ds.tell_bytes());
        assert_eq!("ok!", ds.get_all().unwrap().to_string());
    }

    #[test]
    fn test_incomplete_at_eof() {
        let mut ds = utf8_stream();
        ds.add_bytes(vec![b'a', 0xE2, 0x82]);
        assert_eq!(
            Err(DecodeError::Incomplete {
                encoding: "utf-8",
                offset: 1
            }),
            ds.get_all()
        );
        assert_eq!(0, ds.bytes_available());
        assert_eq!("a", ds.get_all().unwrap().to_string());
        assert!(ds.is_empty());
    }

    #[test]
    fn test_replacement() {
        let config = DecodeStreamConfig::default().with_replacement("\u{FFFD}");
        let mut ds = DecodeStream::new(config);
        ds.add_bytes(vec![b'a', 0xFF, 0xE2, 0x82, b'b', 0xE2]);
        assert_eq!("a\u{FFFD}\u{FFFD}b\u{FFFD}", ds.get_all().unwrap().to_string());
        assert_eq!(6, ds.tell_bytes());
    }

    #[test]
    fn test_windows_1252_stream() {
        let config = DecodeStreamConfig::default().with_encoding(Encoding::Windows1252);
        let mut ds = DecodeStream::new(config);
        ds.add_bytes(vec![0x80, b'e', 0x81]);
        assert!(ds.get_all().is_err());

        let config = DecodeStreamConfig::default()
            .with_encoding(Encoding::Windows1252)
            .with_permissive(true);
        let mut ds = DecodeStream::new(config);
        ds.add_bytes(vec![0x80, b'e', 0x81]);
        assert_eq!(&ds.get_all().unwrap(), "\u{20AC}e\u{81}");
    }

    #[test]
    fn test_raw_byte_access() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"he".to_vec());
        ds.add_bytes(b"llo".to_vec());
        assert!(ds.have_bytes(5));
        assert!(!ds.have_bytes(6));
        assert_eq!(b"hel".to_vec(), ds.bytes_to_buf(3));
        assert_eq!(3, ds.tell_bytes());
        assert_eq!(2, ds.bytes_available());
        assert_eq!("lo", ds.get_all().unwrap().to_string());
        assert_eq!(Vec::<u8>::new(), ds.bytes_to_buf(3));
    }

    #[test]
    fn test_discard_to() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"abc".to_vec());
        ds.add_bytes(b"def".to_vec());
        ds.discard_to(1, 1);
        assert_eq!(4, ds.tell_bytes());
        assert_eq!("ef", ds.get_all().unwrap().to_string());
    }

    #[test]
    fn test_discard_to_behind_head_is_noop() {
        let mut ds = utf8_stream();
        ds.add_bytes(b"abcdef".to_vec());
        ds.discard_to(0, 4);
        assert_eq!(4, ds.tell_bytes());
        ds.discard_to(0, 2);
        assert_eq!(4, ds.tell_bytes());
        assert_eq!(2, ds.bytes_available());
        assert_eq!("ef", ds.get_all().unwrap().to_string());
    }

    #[test]
    fn test_separator_search_resumes() {
        let dashes = Separators::from_strs(&["--"]);
        let mut ds = utf8_stream();
        for chunk in ["x-y", "-z-", "-"] {
            ds.add_bytes(chunk.as_bytes().to_vec());
            assert_eq!(None, ds.get_until_sep(&dashes, true).unwrap());
        }
        ds.add_bytes(b"-w-".to_vec());
        let line = ds.get_until_sep(&dashes, true).unwrap().unwrap();
        assert_eq!("x-y-z", line.to_string());
        assert_eq!(None, ds.get_until_sep(&dashes, true).unwrap());
        assert_eq!("-w-", ds.get_until_sep_eof(&dashes, true).unwrap().unwrap().to_string());
    }

    #[test]
    fn test_separator_search_restarts_for_other_separators() {
        let dashes = Separators::from_strs(&["--"]);
        let mut ds = utf8_stream();
        ds.add_bytes(b"a\n-b-".to_vec());
        assert_eq!(None, ds.get_until_sep(&dashes, false).unwrap());
        // The dash search already went past the newline.
        let line = ds.get_until_sep(&Separators::lines(), false).unwrap().unwrap();
        assert_eq!("a\n", line.to_string());
        ds.add_bytes(b"-c".to_vec());
        assert_eq!("-b--", ds.get_until_sep(&dashes, false).unwrap().unwrap().to_string());
    }

    #[test]
    fn test_add_chars_and_is_empty() {
        let mut ds = utf8_stream();
        assert!(ds.is_empty());
        ds.add_bytes(Vec::new());
        assert!(ds.is_empty());
        ds.add_chars(vec![Grapheme::from_char('q')]);
        assert!(!ds.is_empty());
        assert_eq!("q", ds.get_chars(1).unwrap().unwrap().to_string());
        assert!(ds.is_empty());
    }

    #[test]
    fn test_small_result_buffers() {
        let mut ds = DecodeStream::new(DecodeStreamConfig::default().with_result_size_guess(2));
        ds.add_bytes(b"abcdefg\n".to_vec());
        assert_eq!("abc", ds.get_chars(3).unwrap().unwrap().to_string());
        let line = ds.get_until_separator(Grapheme::from_char('\n')).unwrap();
        assert_eq!("defg\n", line.unwrap().to_string());
    }

    fn text() -> impl Strategy<Value = String> {
        let alphabet = prop::sample::select(vec![
            'a', 'e', ' ', '\r', '\n', '\u{301}', '\u{323}', '\u{E9}', '\u{1100}', '\u{1161}',
            '\u{AC00}', '\u{1F600}', '\u{200D}', '\u{1F1E6}',
        ]);
        prop::collection::vec(alphabet, 0..24).prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn test_split_points_do_not_matter(
            s in text(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let bytes = s.as_bytes();
            let mut whole = utf8_stream();
            whole.add_bytes(bytes.to_vec());
            let expected = whole.get_all().unwrap();
            prop_assert_eq!(&expected, &NfgString::from_str(&s));

            let mut points = cuts.iter().map(|idx| idx.index(bytes.len() + 1)).collect::<Vec<_>>();
            points.sort_unstable();
            let mut split = utf8_stream();
            let mut collected = Vec::new();
            let mut prev = 0;
            for point in points.into_iter().chain(std::iter::once(bytes.len())) {
                split.add_bytes(bytes[prev..point].to_vec());
                prev = point;
                collected.extend(split.get_available().unwrap().into_graphemes());
            }
            collected.extend(split.get_all().unwrap().into_graphemes());
            prop_assert_eq!(expected, NfgString::from_graphemes(collected));
        }
    }
}
