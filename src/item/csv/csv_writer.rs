use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{
    core::{
        bom::ByteOrderMark,
        dialect::{Dialect, DialectBuilder, LineBreak, QuotePolicy},
        item::{RecordWriter, Value},
    },
    error::{CsvError, CsvResult},
};

/// Horizontal alignment of a padded column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Minimum widths for pretty-printed output.
///
/// Padding is added with spaces outside of the quotes, so it only reads back
/// as the written values with a dialect that trims them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<(usize, Alignment)>,
}

impl ColumnLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the layout of the next column.
    pub fn column(mut self, width: usize, alignment: Alignment) -> Self {
        self.columns.push((width, alignment));
        self
    }

    fn pad(&self, index: usize, cell: String) -> String {
        let Some(&(width, alignment)) = self.columns.get(index) else {
            return cell;
        };
        match alignment {
            Alignment::Left => format!("{cell:<width$}"),
            Alignment::Right => format!("{cell:>width$}"),
        }
    }
}

/// A CSV record writer that implements the `RecordWriter` trait.
///
/// Each call to `write` serializes one record terminated by the configured
/// line break. The first record (or the header row) fixes the number of
/// columns of the session.
///
/// # Examples
///
/// ```
/// use csv_codec::core::{dialect::QuotePolicy, item::Value};
/// use csv_codec::item::csv::csv_writer::CsvRecordWriterBuilder;
///
/// let writer = CsvRecordWriterBuilder::new()
///     .quote_policy(QuotePolicy::StringsOnly)
///     .headers(&["city", "pop"])
///     .from_writer(vec![])
///     .unwrap();
///
/// writer.write(&[Value::from("Boston"), Value::from(4628910)]).unwrap();
/// writer.write(&[Value::from("Concord, MA"), Value::Null]).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "\"city\",\"pop\"\n\"Boston\",4628910\n\"Concord, MA\",\n");
/// ```
pub struct CsvRecordWriter<W: Write> {
    wrapper: RefCell<W>,
    dialect: Dialect,
    quote_policy: QuotePolicy,
    line_break: LineBreak,
    layout: Option<ColumnLayout>,
    headers: Option<Vec<String>>,
    write_bom: bool,
    bom_written: Cell<bool>,
    started: Cell<bool>,
    expected_columns: Cell<Option<usize>>,
    lines_written: Cell<usize>,
}

impl<W: Write> CsvRecordWriter<W> {
    /// Serializes one record.
    ///
    /// Nothing is written when the record is rejected.
    pub fn write(&self, record: &[Value]) -> CsvResult<()> {
        self.start()?;
        self.write_line(record)
    }

    pub fn write_all<T: AsRef<[Value]>>(&self, records: &[T]) -> CsvResult<()> {
        records
            .iter()
            .try_for_each(|record| self.write(record.as_ref()))
    }

    /// Flush the contents of the underlying writer.
    pub fn flush(&self) -> CsvResult<()> {
        self.start()?;
        self.wrapper.borrow_mut().flush()?;
        Ok(())
    }

    /// Number of lines written so far, header included.
    pub fn lines_written(&self) -> usize {
        self.lines_written.get()
    }

    pub fn expected_columns(&self) -> Option<usize> {
        self.expected_columns.get()
    }

    pub fn into_inner(self) -> CsvResult<W> {
        self.flush()?;
        Ok(self.wrapper.into_inner())
    }

    /// Writes the byte-order mark and the header row once.
    ///
    /// The session only starts once both are written: a failed header is
    /// retried, and fails again, on the next call.
    fn start(&self) -> CsvResult<()> {
        if self.started.get() {
            return Ok(());
        }

        if self.write_bom && !self.bom_written.get() {
            match ByteOrderMark::for_encoding(self.dialect.encoding()) {
                Some(mark) => {
                    self.wrapper.borrow_mut().write_all(mark.as_bytes())?;
                    self.bom_written.set(true);
                }
                None => debug!("{} has no byte-order mark", self.dialect.encoding().name()),
            }
        }

        if let Some(headers) = &self.headers {
            let headers: Vec<Value> = headers.iter().map(|name| Value::from(name.as_str())).collect();
            self.write_line(&headers)?;
        }
        self.started.set(true);
        Ok(())
    }

    fn write_line(&self, record: &[Value]) -> CsvResult<()> {
        let line_number = self.lines_written.get() + 1;

        if let Some(expected) = self.expected_columns.get() {
            if expected != record.len() {
                return Err(CsvError::data(
                    line_number,
                    format!(
                        "wrong number of columns: expected {expected}, actual {}",
                        record.len()
                    ),
                ));
            }
        }

        let mut line = String::new();
        for (index, value) in record.iter().enumerate() {
            if index > 0 {
                line.push(self.dialect.separator());
            }
            // a lone empty value would read back as a blank line, a leading
            // U+FEFF as a byte-order mark
            let ambiguous = (record.len() == 1 && value.as_str().is_empty())
                || (index == 0 && line_number == 1 && self.starts_with_bom_char(value));
            let cell = self.format_field(value, ambiguous, line_number, index)?;
            match &self.layout {
                Some(layout) => line.push_str(&layout.pad(index, cell)),
                None => line.push_str(&cell),
            }
        }
        line.push_str(self.line_break.as_str());

        let bytes = self.encode(&line)?;
        self.wrapper.borrow_mut().write_all(&bytes)?;
        self.expected_columns.set(Some(record.len()));
        self.lines_written.set(line_number);
        Ok(())
    }

    fn format_field(
        &self,
        value: &Value,
        ambiguous: bool,
        line_number: usize,
        index: usize,
    ) -> CsvResult<String> {
        let text = value.as_str();
        let required = ambiguous || self.requires_quotes(text);

        let quoted = match self.quote_policy {
            QuotePolicy::Always => true,
            QuotePolicy::StringsOnly => value.is_text() || required,
            QuotePolicy::IfNeeded => required,
            QuotePolicy::Never => false,
        };

        match self.dialect.quote() {
            Some(quote) if quoted => Ok(self.quote(text, quote)),
            _ if required => Err(CsvError::data(
                line_number,
                format!("column {} needs quotes but quoting is disabled", index + 1),
            )),
            _ => Ok(text.to_string()),
        }
    }

    /// Whether the stream would start with U+FEFF, which readers take for a mark.
    fn starts_with_bom_char(&self, value: &Value) -> bool {
        !self.bom_written.get() && value.as_str().starts_with('\u{FEFF}')
    }

    fn requires_quotes(&self, text: &str) -> bool {
        let quote = self.dialect.quote();
        text.chars().any(|c| {
            c == self.dialect.separator() || c == '\r' || c == '\n' || Some(c) == quote
        })
    }

    fn quote(&self, text: &str, quote: char) -> String {
        let escape = self.dialect.escape().unwrap_or(quote);
        let distinct_escape = self.dialect.distinct_escape();

        let mut quoted = String::with_capacity(text.len() + 2);
        quoted.push(quote);
        for c in text.chars() {
            if c == quote || Some(c) == distinct_escape {
                quoted.push(escape);
            }
            quoted.push(c);
        }
        quoted.push(quote);
        quoted
    }

    fn encode<'a>(&self, text: &'a str) -> CsvResult<Cow<'a, [u8]>> {
        let encoding = self.dialect.encoding();
        if encoding == encoding_rs::UTF_16LE {
            return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        }
        if encoding == encoding_rs::UTF_16BE {
            return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
        }

        let (bytes, _, had_errors) = encoding.encode(text);
        if had_errors {
            return Err(CsvError::Encoding(format!(
                "{text:?} cannot be represented in {}",
                encoding.name()
            )));
        }
        Ok(bytes)
    }
}

impl<W: Write> RecordWriter for CsvRecordWriter<W> {
    fn write(&self, record: &[Value]) -> CsvResult<()> {
        CsvRecordWriter::write(self, record)
    }

    fn flush(&self) -> CsvResult<()> {
        CsvRecordWriter::flush(self)
    }

    fn open(&self) -> CsvResult<()> {
        self.start()
    }
}

/// A builder for configuring CSV record writing.
///
/// # Default Configuration
///
/// - Dialect: `Dialect::default()` (comma, double quote, UTF-8)
/// - Quote policy: `QuotePolicy::IfNeeded`
/// - Line break: `LineBreak::Lf`
/// - No header row, no byte-order mark, no padding
#[derive(Default)]
pub struct CsvRecordWriterBuilder {
    dialect: DialectBuilder,
    quote_policy: QuotePolicy,
    line_break: LineBreak,
    layout: Option<ColumnLayout>,
    headers: Option<Vec<String>>,
    write_bom: bool,
}

impl CsvRecordWriterBuilder {
    pub fn new() -> CsvRecordWriterBuilder {
        Self::default()
    }

    pub fn dialect(mut self, dialect: Dialect) -> CsvRecordWriterBuilder {
        self.dialect = DialectBuilder::from(dialect);
        self
    }

    pub fn separator(mut self, separator: char) -> CsvRecordWriterBuilder {
        self.dialect = self.dialect.separator(separator);
        self
    }

    pub fn quote_policy(mut self, quote_policy: QuotePolicy) -> CsvRecordWriterBuilder {
        self.quote_policy = quote_policy;
        self
    }

    pub fn line_break(mut self, line_break: LineBreak) -> CsvRecordWriterBuilder {
        self.line_break = line_break;
        self
    }

    /// Writes a header row before the first record.
    pub fn headers(mut self, headers: &[&str]) -> CsvRecordWriterBuilder {
        self.headers = Some(headers.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Starts the output with the byte-order mark of the dialect encoding.
    pub fn write_bom(mut self, yes: bool) -> CsvRecordWriterBuilder {
        self.write_bom = yes;
        self
    }

    pub fn column_layout(mut self, layout: ColumnLayout) -> CsvRecordWriterBuilder {
        self.layout = Some(layout);
        self
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvResult<CsvRecordWriter<BufWriter<File>>> {
        let file = File::create(path)?;
        self.from_writer(BufWriter::new(file))
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> CsvResult<CsvRecordWriter<W>> {
        let dialect = self.dialect.build()?;

        Ok(CsvRecordWriter {
            wrapper: RefCell::new(wtr),
            dialect,
            quote_policy: self.quote_policy,
            line_break: self.line_break,
            layout: self.layout,
            headers: self.headers,
            write_bom: self.write_bom,
            bom_written: Cell::new(false),
            started: Cell::new(false),
            expected_columns: Cell::new(None),
            lines_written: Cell::new(0),
        })
    }
}
