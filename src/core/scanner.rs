use std::io::{ErrorKind, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};
use log::{debug, warn};

use crate::{
    core::bom::{self, ByteOrderMark},
    error::{CsvError, CsvResult},
};

const BUFFER_SIZE: usize = 8 * 1024;

enum Source<R> {
    Open(R),
    /// End of data was reached and the stream released.
    Exhausted,
    /// Closed explicitly or after a fatal error.
    Closed,
}

/// Character-level scan engine over a byte stream.
///
/// Bytes are decoded lazily with the declared encoding. The scanner keeps the
/// character most recently returned and a single-slot pushback register, so
/// one character of lookahead can be undone with [`Scanner::reuse`].
///
/// # Examples
///
/// ```
/// use csv_codec::core::scanner::Scanner;
///
/// let mut scanner = Scanner::new("  key=value".as_bytes(), encoding_rs::UTF_8);
///
/// assert_eq!(scanner.skip_whitespace().unwrap(), Some('k'));
/// assert_eq!(scanner.scan_until(false, None, &['=']).unwrap(), "key");
///
/// // the delimiter was pushed back
/// assert_eq!(scanner.read_next().unwrap(), Some('='));
/// assert_eq!(scanner.chars_read(), 6);
/// ```
pub struct Scanner<R> {
    source: Source<R>,
    encoding: &'static Encoding,
    decoder: Option<Decoder>,
    buffer: Box<[u8]>,
    decoded: String,
    position: usize,
    current: Option<char>,
    pushback: Option<char>,
    /// Set by `reuse`, cleared by `read_next`, also at the end of the stream.
    reused: bool,
    chars_read: u64,
}

impl<R: Read> Scanner<R> {
    pub fn new(rdr: R, encoding: &'static Encoding) -> Self {
        Self {
            source: Source::Open(rdr),
            encoding,
            decoder: None,
            buffer: vec![0; BUFFER_SIZE].into_boxed_slice(),
            decoded: String::new(),
            position: 0,
            current: None,
            pushback: None,
            reused: false,
            chars_read: 0,
        }
    }

    /// Returns the next character, or `None` at the end of the stream.
    ///
    /// The first call checks the stream for a byte-order mark: a mark matching
    /// the declared encoding is skipped, any other one is an encoding error.
    pub fn read_next(&mut self) -> CsvResult<Option<char>> {
        self.reused = false;
        if let Some(replayed) = self.pushback.take() {
            self.chars_read += 1;
            self.current = Some(replayed);
            return Ok(self.current);
        }

        if self.decoder.is_none() {
            self.start()?;
        }

        self.current = self.decode_next()?;
        if self.current.is_some() {
            self.chars_read += 1;
        }
        Ok(self.current)
    }

    /// Replays the last character on the next [`Scanner::read_next`] call.
    ///
    /// Only one character can be pushed back: a second call without a
    /// `read_next` in between is a usage error, even at the end of the stream.
    pub fn reuse(&mut self) -> CsvResult<()> {
        if self.reused {
            return Err(CsvError::Usage(
                "only one character can be pushed back".to_string(),
            ));
        }
        self.reused = true;
        if let Some(current) = self.current {
            self.pushback = Some(current);
            self.chars_read -= 1;
        }
        Ok(())
    }

    /// Reads until the first non-whitespace character and returns it.
    pub fn skip_whitespace(&mut self) -> CsvResult<Option<char>> {
        loop {
            match self.read_next()? {
                Some(c) if c.is_whitespace() => continue,
                other => return Ok(other),
            }
        }
    }

    /// Accumulates characters until an unescaped delimiter or the end of the stream.
    ///
    /// The scan opens with the current character, which is always kept; only
    /// the characters after it are tested against `delimiters`. A delimiter,
    /// CR, LF or the escape character itself preceded by `escape` is kept as
    /// literal data. The delimiter that ends the scan is appended when
    /// `include_delimiter` is set, otherwise it is pushed back.
    pub fn scan_until(
        &mut self,
        include_delimiter: bool,
        escape: Option<char>,
        delimiters: &[char],
    ) -> CsvResult<String> {
        Self::check_delimiters(escape, delimiters)?;
        let (value, _) = self.scan(include_delimiter, escape, delimiters)?;
        Ok(value)
    }

    /// Reads a quoted value starting at the current character.
    ///
    /// The bounding quotes are stripped. When `escape` is the quote itself, a
    /// doubled quote is one literal quote. Reaching the end of the stream
    /// before the closing quote is fatal: the stream is closed.
    pub fn read_quoted(&mut self, quote: char, escape: Option<char>) -> CsvResult<String> {
        if self.current != Some(quote) {
            return Err(CsvError::Parse(format!(
                "expected {quote:?} but found {:?}",
                self.current
            )));
        }

        let doubled = escape == Some(quote);
        let escape = escape.filter(|escape| *escape != quote);
        Self::check_delimiters(escape, &[quote])?;

        let (mut value, mut terminated) = self.scan(true, escape, &[quote])?;
        while doubled && terminated {
            match self.read_next()? {
                Some(c) if c == quote => {
                    // keep one quote of the pair, the scan restarts on the second
                    value.pop();
                    let (rest, closed) = self.scan(true, None, &[quote])?;
                    value.push_str(&rest);
                    terminated = closed;
                }
                Some(_) => {
                    self.reuse()?;
                    break;
                }
                None => break,
            }
        }
        if !terminated {
            warn!("Unterminated quoted value after {} characters", self.chars_read);
            self.close();
            return Err(CsvError::Parse(
                "unterminated quoted value at end of stream".to_string(),
            ));
        }

        let inner = value
            .strip_prefix(quote)
            .and_then(|value| value.strip_suffix(quote))
            .unwrap_or_default();
        Ok(inner.to_string())
    }

    /// Returns the character most recently read.
    pub fn current(&self) -> Option<char> {
        self.current
    }

    /// Number of characters logically consumed.
    pub fn chars_read(&self) -> u64 {
        self.chars_read
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Releases the underlying stream; further reads fail with [`CsvError::Closed`].
    pub fn close(&mut self) {
        if matches!(self.source, Source::Open(_)) {
            debug!("Closing source after {} characters", self.chars_read);
        }
        self.source = Source::Closed;
        self.pushback = None;
        self.reused = false;
        self.decoded.clear();
        self.position = 0;
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self.source, Source::Open(_))
    }

    fn check_delimiters(escape: Option<char>, delimiters: &[char]) -> CsvResult<()> {
        for (index, delimiter) in delimiters.iter().enumerate() {
            if delimiters[index + 1..].contains(delimiter) {
                return Err(CsvError::Config(format!(
                    "delimiter {delimiter:?} is given twice"
                )));
            }
        }
        if let Some(escape) = escape {
            if delimiters.contains(&escape) {
                return Err(CsvError::Config(format!(
                    "escape character {escape:?} cannot be a delimiter"
                )));
            }
        }
        Ok(())
    }

    /// Returns the scanned value and whether a delimiter ended it.
    fn scan(
        &mut self,
        include_delimiter: bool,
        escape: Option<char>,
        delimiters: &[char],
    ) -> CsvResult<(String, bool)> {
        let mut value = String::new();

        let unread = self.pushback.is_some() || (self.chars_read == 0 && self.current.is_none());
        let mut next = if unread {
            self.read_next()?
        } else {
            self.current
        };
        if let Some(first) = next {
            value.push(first);
            next = self.read_next()?;
        }

        while let Some(c) = next {
            if Some(c) == escape {
                match self.read_next()? {
                    Some(escaped)
                        if delimiters.contains(&escaped)
                            || escaped == '\r'
                            || escaped == '\n'
                            || Some(escaped) == escape =>
                    {
                        value.push(escaped);
                    }
                    Some(_) => {
                        value.push(c);
                        self.reuse()?;
                    }
                    None => {
                        value.push(c);
                        return Ok((value, false));
                    }
                }
            } else if delimiters.contains(&c) {
                if include_delimiter {
                    value.push(c);
                } else {
                    self.reuse()?;
                }
                return Ok((value, true));
            } else {
                value.push(c);
            }
            next = self.read_next()?;
        }

        Ok((value, false))
    }

    /// Reads the stream prefix, handles a byte-order mark and sets up the decoder.
    fn start(&mut self) -> CsvResult<()> {
        let mut prefix = Vec::with_capacity(4);
        let mut last = false;
        while prefix.len() < 4 {
            let read = self.fill()?;
            if read == 0 {
                last = true;
                break;
            }
            prefix.extend_from_slice(&self.buffer[..read]);
        }

        let skip = match self.check_bom(&prefix) {
            Ok(skip) => skip,
            Err(error) => {
                self.close();
                return Err(error);
            }
        };

        self.decoder = Some(self.encoding.new_decoder_without_bom_handling());
        self.decode(&prefix[skip..], last);
        if last {
            self.release();
        }
        Ok(())
    }

    /// Returns the number of BOM bytes to skip.
    fn check_bom(&self, prefix: &[u8]) -> CsvResult<usize> {
        let Some(mut mark) = ByteOrderMark::detect(prefix) else {
            return Ok(0);
        };

        // FF FE 00 00 is also a UTF-16LE mark followed by U+0000
        if mark == ByteOrderMark::Utf32Le && self.encoding == encoding_rs::UTF_16LE {
            mark = ByteOrderMark::Utf16Le;
        }

        if mark.encoding() == Some(self.encoding) {
            debug!("Skipping {:?} byte-order mark", mark);
            return Ok(mark.len());
        }

        // in a legacy charset these bytes are text, e.g. "ÿþ" in latin1
        if ByteOrderMark::for_encoding(self.encoding).is_none() {
            if mark == ByteOrderMark::Utf8 && bom::is_iso_8859_family(self.encoding) {
                return Err(CsvError::Encoding(format!(
                    "stream starts with a UTF-8 byte-order mark but is declared as {}",
                    self.encoding.name()
                )));
            }
            return Ok(0);
        }

        Err(CsvError::Encoding(format!(
            "stream starts with a {:?} byte-order mark but is declared as {}",
            mark,
            self.encoding.name()
        )))
    }

    fn decode_next(&mut self) -> CsvResult<Option<char>> {
        loop {
            if let Some(c) = self.decoded[self.position..].chars().next() {
                self.position += c.len_utf8();
                return Ok(Some(c));
            }
            self.decoded.clear();
            self.position = 0;

            match self.source {
                Source::Open(_) => {}
                Source::Exhausted => return Ok(None),
                Source::Closed => return Err(CsvError::Closed),
            }

            let read = self.fill()?;
            if read == 0 {
                self.decode(&[], true);
                self.release();
            } else {
                let buffer = std::mem::take(&mut self.buffer);
                self.decode(&buffer[..read], false);
                self.buffer = buffer;
            }
        }
    }

    fn decode(&mut self, mut input: &[u8], last: bool) {
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        loop {
            if let Some(needed) = decoder.max_utf8_buffer_length(input.len()) {
                self.decoded.reserve(needed);
            }
            let (result, read, _) = decoder.decode_to_string(input, &mut self.decoded, last);
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => self.decoded.reserve(BUFFER_SIZE),
            }
        }
    }

    /// Reads the next chunk of bytes into the buffer.
    fn fill(&mut self) -> CsvResult<usize> {
        let rdr = match &mut self.source {
            Source::Open(rdr) => rdr,
            Source::Exhausted => return Ok(0),
            Source::Closed => return Err(CsvError::Closed),
        };
        loop {
            match rdr.read(&mut self.buffer) {
                Ok(read) => return Ok(read),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Drops the stream once all of its data has been read.
    fn release(&mut self) {
        if matches!(self.source, Source::Open(_)) {
            debug!("End of data after {} characters", self.chars_read);
            self.source = Source::Exhausted;
        }
    }
}
