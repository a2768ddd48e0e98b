use std::fmt;

use crate::error::CsvResult;

/// One nullable text value within a record.
pub type Field = Option<String>;

/// An ordered sequence of fields.
pub type Record = Vec<Field>;

/// Represents the result of reading a record from a reader.
///
/// `Ok(Some(record))` carries the next record, `Ok(None)` signals the end of
/// the stream and `Err` reports a codec failure.
pub type RecordReaderResult = CsvResult<Option<Record>>;

/// A value handed to a writer.
///
/// The writer's quoting policy depends on whether a value is textual, so the
/// caller tags every value explicitly instead of the writer guessing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Written as an empty string.
    Null,
    /// Textual data, quoted under `QuotePolicy::StringsOnly`.
    Text(String),
    /// Already stringified non-textual data (numbers, booleans, dates...).
    Other(String),
}

impl Value {
    /// Returns the string form written to the output.
    pub fn as_str(&self) -> &str {
        match self {
            Value::Null => "",
            Value::Text(value) | Value::Other(value) => value,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Other(value.to_string())
                }
            }
        )*
    };
}

value_from_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, bool, char);

/// A source of records, pulled one at a time.
pub trait RecordReader {
    fn read(&self) -> RecordReaderResult;
}

/// A sink of records.
///
/// `open` and `close` bracket a writing session; the default implementations
/// do nothing.
pub trait RecordWriter {
    fn write(&self, record: &[Value]) -> CsvResult<()>;

    fn flush(&self) -> CsvResult<()>;

    fn open(&self) -> CsvResult<()> {
        Ok(())
    }

    fn close(&self) -> CsvResult<()> {
        self.flush()
    }
}
