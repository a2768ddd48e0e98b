use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::Read,
    path::Path,
};

use log::{debug, warn};

use crate::{
    core::{
        dialect::{Dialect, DialectBuilder},
        item::{Record, RecordReader, RecordReaderResult},
        scanner::Scanner,
    },
    error::{CsvError, CsvResult},
};

use super::grammar::{self, Action, CharClass, Classifier, State};

/// Read mode of a session, fixed by the first read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Unset,
    PerRecord,
    Bulk,
}

/// Record grammar bound to one scanner and one dialect.
pub(crate) struct RecordParser<R> {
    scanner: Scanner<R>,
    dialect: Dialect,
    classifier: Classifier,
    expected_columns: Option<usize>,
    line: usize,
}

impl<R: Read> RecordParser<R> {
    pub(crate) fn new(rdr: R, dialect: Dialect) -> Self {
        Self {
            scanner: Scanner::new(rdr, dialect.encoding()),
            classifier: Classifier::new(&dialect),
            dialect,
            expected_columns: None,
            line: 1,
        }
    }

    /// Parses the next record.
    ///
    /// When `collect` is false the record is only recognised: field values are
    /// neither built nor checked and an empty record is returned.
    ///
    /// A data error is returned once the offending record has been consumed,
    /// so the next call resumes with the following record.
    pub(crate) fn next_record(&mut self, collect: bool) -> CsvResult<Option<Record>> {
        let mut fields = Record::new();
        let mut raw = String::new();
        let mut state = State::Unquoted;
        let mut content = false;
        let mut error: Option<CsvError> = None;

        let end_line = loop {
            let Some(c) = self.scanner.read_next()? else {
                if state == State::Quoted {
                    warn!("Unterminated quoted field at line {}", self.line);
                    self.scanner.close();
                    return Err(CsvError::Parse(format!(
                        "unterminated quoted field at end of stream, line {}",
                        self.line
                    )));
                }
                if !content {
                    return Ok(None);
                }
                self.flush_field(&mut raw, &mut fields, collect, &mut error);
                break self.line;
            };

            let class = self.classifier.classify(c);
            let action = grammar::transition(state, class);
            if action != Action::EndRecord {
                content = true;
            }

            match action {
                Action::Append => push(&mut raw, c, collect),
                Action::OpenQuote => {
                    push(&mut raw, c, collect);
                    state = State::Quoted;
                }
                Action::CloseQuote => {
                    push(&mut raw, c, collect);
                    state = State::Unquoted;
                }
                Action::EscapeNext => {
                    push(&mut raw, c, collect);
                    match self.scanner.read_next()? {
                        Some(next) if self.classifier.is_escapable(next) => {
                            push(&mut raw, next, collect)
                        }
                        Some(_) => self.scanner.reuse()?,
                        None => {}
                    }
                }
                Action::EndField => self.flush_field(&mut raw, &mut fields, collect, &mut error),
                Action::EndRecord => {
                    if class == CharClass::Cr {
                        self.skip_lf()?;
                    }
                    if !content {
                        // blank line
                        self.line += 1;
                        continue;
                    }
                    self.flush_field(&mut raw, &mut fields, collect, &mut error);
                    self.line += 1;
                    break self.line - 1;
                }
                Action::EmbeddedLinebreak => {
                    let crlf = class == CharClass::Cr && self.skip_lf()?;
                    if self.dialect.allow_embedded_linebreaks() {
                        push(&mut raw, c, collect);
                        if crlf {
                            push(&mut raw, '\n', collect);
                        }
                    } else if error.is_none() {
                        error = Some(CsvError::data(
                            self.line,
                            "not allowed linebreak in data",
                        ));
                    }
                    self.line += 1;
                }
            }
        };

        if let Some(error) = error {
            return Err(error);
        }
        if collect {
            self.check_columns(&mut fields, end_line)?;
        }
        Ok(Some(fields))
    }

    /// Consumes the LF of a CRLF pair, returns whether there was one.
    fn skip_lf(&mut self) -> CsvResult<bool> {
        match self.scanner.read_next()? {
            Some('\n') => Ok(true),
            Some(_) => {
                self.scanner.reuse()?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn flush_field(
        &self,
        raw: &mut String,
        fields: &mut Record,
        collect: bool,
        error: &mut Option<CsvError>,
    ) {
        if !collect {
            return;
        }
        match self.finish_field(std::mem::take(raw)) {
            Ok(value) => fields.push(Some(value)),
            Err(field_error) => {
                fields.push(None);
                if error.is_none() {
                    *error = Some(field_error);
                }
            }
        }
    }

    /// Turns a raw field into its value: unquoting, linebreak normalization,
    /// embedded quote policy and trimming.
    fn finish_field(&self, raw: String) -> CsvResult<String> {
        let mut value = raw;

        if let Some(quote) = self.dialect.quote() {
            if value.contains(quote) {
                value = grammar::unquote(&value, quote, self.dialect.distinct_escape());
                if !self.dialect.allow_embedded_quotes() && value.contains(quote) {
                    return Err(CsvError::data(self.line, "not allowed quote in data"));
                }
            }
        }

        value = grammar::normalize_linebreaks(value);

        if self.dialect.trim_values() {
            value = value.trim().to_string();
        }
        Ok(value)
    }

    fn check_columns(&mut self, fields: &mut Record, line: usize) -> CsvResult<()> {
        match self.expected_columns {
            None => {
                debug!("Expecting {} columns per record", fields.len());
                self.expected_columns = Some(fields.len());
            }
            Some(expected) if fields.len() == expected => {}
            Some(expected) if fields.len() < expected && self.dialect.fill_missing_columns() => {
                fields.resize(expected, None);
            }
            Some(expected) => {
                warn!(
                    "Line {}: expected {} columns but found {}",
                    line,
                    expected,
                    fields.len()
                );
                return Err(CsvError::data(
                    line,
                    format!(
                        "wrong number of columns: expected {expected}, actual {}",
                        fields.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn push(raw: &mut String, c: char, collect: bool) {
    if collect {
        raw.push(c);
    }
}

/// A CSV record reader that implements the `RecordReader` trait.
///
/// This reader pulls records from a byte stream one at a time (`read`,
/// `records`) or all at once (`read_all`, `count_lines`). The first call fixes
/// the mode of the session: mixing per-record and bulk calls afterwards is a
/// usage error.
///
/// # Implementation Details
///
/// - Uses a `RefCell` around the parser so records can be read through `&self`
/// - The first non-empty record sets the number of columns every later record must have
/// - The stream is released at the end of data, or closed on an unterminated quote
///
/// # Examples
///
/// ```
/// use csv_codec::item::csv::csv_reader::CsvRecordReaderBuilder;
///
/// let data = "\
/// name,value
/// foo,\"1,5\"
/// bar,
/// ";
///
/// let reader = CsvRecordReaderBuilder::new()
///     .has_headers(true)
///     .from_reader(data.as_bytes())
///     .unwrap();
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(record, vec![Some("foo".to_string()), Some("1,5".to_string())]);
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(record, vec![Some("bar".to_string()), Some(String::new())]);
///
/// assert!(reader.read().unwrap().is_none());
///
/// // Bulk reads are refused once the session reads record by record
/// assert!(reader.read_all().is_err());
/// ```
pub struct CsvRecordReader<R> {
    parser: RefCell<RecordParser<R>>,
    mode: Cell<ReadMode>,
    has_headers: bool,
    headers: RefCell<Option<Record>>,
    headers_read: Cell<bool>,
}

impl<R: Read> CsvRecordReader<R> {
    fn new(rdr: R, dialect: Dialect, has_headers: bool) -> Self {
        Self {
            parser: RefCell::new(RecordParser::new(rdr, dialect)),
            mode: Cell::new(ReadMode::Unset),
            has_headers,
            headers: RefCell::new(None),
            headers_read: Cell::new(false),
        }
    }

    /// Reads the next record, `None` at the end of the stream.
    pub fn read(&self) -> RecordReaderResult {
        self.enter(ReadMode::PerRecord)?;
        self.read_headers()?;
        self.parser.borrow_mut().next_record(true)
    }

    /// Reads every remaining record.
    pub fn read_all(&self) -> CsvResult<Vec<Record>> {
        self.enter(ReadMode::Bulk)?;
        self.read_headers()?;

        let mut parser = self.parser.borrow_mut();
        let mut records = Vec::new();
        while let Some(record) = parser.next_record(true)? {
            records.push(record);
        }
        Ok(records)
    }

    /// Counts the remaining records without building them.
    ///
    /// Uses the bulk mode. Column counts are not checked.
    pub fn count_lines(&self) -> CsvResult<usize> {
        self.enter(ReadMode::Bulk)?;
        self.read_headers()?;

        let mut parser = self.parser.borrow_mut();
        let mut count = 0;
        while parser.next_record(false)?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Returns an iterator over the remaining records.
    ///
    /// The iterator stops after the end of the stream or a fatal error; data
    /// errors are yielded and iteration may continue past them.
    pub fn records(&self) -> Records<'_, R> {
        Records {
            reader: self,
            done: false,
        }
    }

    /// Returns the header record when the reader was built with headers.
    pub fn headers(&self) -> CsvResult<Option<Record>> {
        self.read_headers()?;
        Ok(self.headers.borrow().clone())
    }

    pub fn mode(&self) -> ReadMode {
        self.mode.get()
    }

    /// Current physical line, starting at 1.
    pub fn line(&self) -> usize {
        self.parser.borrow().line
    }

    pub fn chars_read(&self) -> u64 {
        self.parser.borrow().scanner.chars_read()
    }

    /// Column count established by the first non-empty record.
    pub fn expected_columns(&self) -> Option<usize> {
        self.parser.borrow().expected_columns
    }

    pub fn dialect(&self) -> Dialect {
        self.parser.borrow().dialect.clone()
    }

    /// Closes the underlying stream. Later reads fail with `CsvError::Closed`.
    pub fn close(&self) {
        self.parser.borrow_mut().scanner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.parser.borrow().scanner.is_closed()
    }

    fn enter(&self, mode: ReadMode) -> CsvResult<()> {
        match self.mode.get() {
            ReadMode::Unset => {
                self.mode.set(mode);
                Ok(())
            }
            current if current == mode => Ok(()),
            current => Err(CsvError::Usage(format!(
                "reader is in {current:?} mode, {mode:?} reads are not allowed"
            ))),
        }
    }

    /// Reads the header row once. A header row that cannot be read closes
    /// the source, so its data rows are never taken for the header.
    fn read_headers(&self) -> CsvResult<()> {
        if !self.has_headers || self.headers_read.get() {
            return Ok(());
        }
        let mut parser = self.parser.borrow_mut();
        match parser.next_record(true) {
            Ok(headers) => {
                *self.headers.borrow_mut() = headers;
                self.headers_read.set(true);
                Ok(())
            }
            Err(error) => {
                warn!("Invalid header row: {}", error);
                parser.scanner.close();
                Err(error)
            }
        }
    }
}

impl<R: Read> RecordReader for CsvRecordReader<R> {
    fn read(&self) -> RecordReaderResult {
        CsvRecordReader::read(self)
    }
}

/// Iterator over the records of a [`CsvRecordReader`].
pub struct Records<'a, R> {
    reader: &'a CsvRecordReader<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = CsvResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = !matches!(error, CsvError::Data { .. });
                Some(Err(error))
            }
        }
    }
}

/// A builder for configuring CSV record reading.
///
/// # Default Configuration
///
/// - Dialect: `Dialect::default()` (comma, double quote, UTF-8)
/// - Headers: disabled
///
/// # Examples
///
/// ```
/// use csv_codec::item::csv::csv_reader::CsvRecordReaderBuilder;
///
/// let reader = CsvRecordReaderBuilder::new()
///     .separator(';')
///     .from_reader("name;age\nAlice;30".as_bytes())
///     .unwrap();
///
/// assert_eq!(reader.count_lines().unwrap(), 2);
/// ```
#[derive(Default)]
pub struct CsvRecordReaderBuilder {
    dialect: DialectBuilder,
    has_headers: bool,
}

impl CsvRecordReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = DialectBuilder::from(dialect);
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.dialect = self.dialect.separator(separator);
        self
    }

    pub fn quote(mut self, quote: Option<char>) -> Self {
        self.dialect = self.dialect.quote(quote);
        self
    }

    /// Sets whether the first non-empty record holds the column names.
    ///
    /// The header is available through `headers()` and is not returned as data.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Creates a `CsvRecordReader` from a reader.
    ///
    /// Fails with `CsvError::Config` when the dialect characters collide.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvResult<CsvRecordReader<R>> {
        let dialect = self.dialect.build()?;
        Ok(CsvRecordReader::new(rdr, dialect, self.has_headers))
    }

    /// Creates a `CsvRecordReader` from a file path.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvResult<CsvRecordReader<File>> {
        let dialect = self.dialect.build()?;
        let file = File::open(path)?;
        Ok(CsvRecordReader::new(file, dialect, self.has_headers))
    }
}
