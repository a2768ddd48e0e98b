use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{CsvError, CsvResult};

/// Line terminator emitted by writers.
///
/// Readers always accept CR, LF and CRLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineBreak {
    #[default]
    Lf,
    CrLf,
    Cr,
}

impl LineBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
            LineBreak::Cr => "\r",
        }
    }
}

/// Decides which fields a writer encloses in quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuotePolicy {
    /// Quote every field.
    Always,
    /// Quote fields whose value is `Value::Text`, and any field that needs it.
    StringsOnly,
    /// Quote only fields containing the quote, separator, CR or LF.
    #[default]
    IfNeeded,
    /// Never quote; a field that needs quoting is a data error.
    Never,
}

/// The set of characters and policies governing one CSV stream.
///
/// Build one through [`DialectBuilder`] or load it with [`Dialect::from_json`];
/// both validate that separator, quote, escape, CR and LF are pairwise distinct.
///
/// # Examples
///
/// ```
/// use csv_codec::core::dialect::DialectBuilder;
///
/// let dialect = DialectBuilder::new()
///     .separator(';')
///     .escape(Some('\\'))
///     .build()
///     .unwrap();
///
/// assert_eq!(dialect.separator(), ';');
/// assert_eq!(dialect.escape(), Some('\\'));
///
/// // A quote colliding with the separator is rejected
/// assert!(DialectBuilder::new().separator('"').build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    separator: char,
    quote: Option<char>,
    escape: Option<char>,
    allow_embedded_linebreaks: bool,
    allow_embedded_quotes: bool,
    fill_missing_columns: bool,
    trim_values: bool,
    #[serde(with = "encoding_label")]
    encoding: &'static Encoding,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            separator: ',',
            quote: Some('"'),
            escape: None,
            allow_embedded_linebreaks: true,
            allow_embedded_quotes: true,
            fill_missing_columns: false,
            trim_values: false,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl Dialect {
    /// Loads a dialect from JSON. Missing keys take their default value.
    ///
    /// ```
    /// use csv_codec::core::dialect::Dialect;
    ///
    /// let dialect = Dialect::from_json(r#"{ "separator": "\t", "encoding": "latin1" }"#).unwrap();
    /// assert_eq!(dialect.separator(), '\t');
    /// assert_eq!(dialect.encoding().name(), "windows-1252");
    /// ```
    pub fn from_json(json: &str) -> CsvResult<Dialect> {
        let dialect: Dialect =
            serde_json::from_str(json).map_err(|error| CsvError::Config(error.to_string()))?;
        dialect.validate()?;
        Ok(dialect)
    }

    pub fn to_json(&self) -> CsvResult<String> {
        serde_json::to_string(self).map_err(|error| CsvError::Config(error.to_string()))
    }

    /// Checks that every special character of the dialect is distinct.
    pub fn validate(&self) -> CsvResult<()> {
        let mut specials = vec![
            ("separator", self.separator),
            ("carriage return", '\r'),
            ("line feed", '\n'),
        ];
        if let Some(quote) = self.quote {
            specials.push(("quote", quote));
        }
        match (self.quote, self.escape) {
            (None, Some(_)) => {
                return Err(CsvError::Config(
                    "an escape character requires a quote character".to_string(),
                ));
            }
            (Some(quote), Some(escape)) if escape != quote => specials.push(("escape", escape)),
            _ => {}
        }

        for (index, (name, value)) in specials.iter().enumerate() {
            if let Some((other, _)) = specials[index + 1..].iter().find(|(_, c)| c == value) {
                return Err(CsvError::Config(format!(
                    "{name} and {other} must differ, both are {value:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Returns the quote character, `None` when quoting is disabled.
    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Returns the character escaping a quote inside a quoted field.
    ///
    /// Defaults to the quote character itself (doubled quotes).
    pub fn escape(&self) -> Option<char> {
        self.escape.or(self.quote)
    }

    /// Returns the escape character only when it differs from the quote.
    pub(crate) fn distinct_escape(&self) -> Option<char> {
        self.escape.filter(|escape| Some(*escape) != self.quote)
    }

    pub fn allow_embedded_linebreaks(&self) -> bool {
        self.allow_embedded_linebreaks
    }

    pub fn allow_embedded_quotes(&self) -> bool {
        self.allow_embedded_quotes
    }

    pub fn fill_missing_columns(&self) -> bool {
        self.fill_missing_columns
    }

    pub fn trim_values(&self) -> bool {
        self.trim_values
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

/// A builder for [`Dialect`].
///
/// Default configuration:
/// - Separator: comma (,)
/// - Quote and escape: double quote (")
/// - Encoding: UTF-8
/// - Embedded linebreaks and quotes: allowed
/// - Missing trailing columns: rejected
/// - Trimming: disabled
#[derive(Default)]
pub struct DialectBuilder {
    dialect: Dialect,
    encoding_label: Option<String>,
}

impl DialectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.dialect.separator = separator;
        self
    }

    /// Sets the quote character; `None` disables quoting.
    pub fn quote(mut self, quote: Option<char>) -> Self {
        self.dialect.quote = quote;
        self
    }

    /// Sets the quote escape character; `None` falls back to doubled quotes.
    pub fn escape(mut self, escape: Option<char>) -> Self {
        self.dialect.escape = escape;
        self
    }

    pub fn allow_embedded_linebreaks(mut self, yes: bool) -> Self {
        self.dialect.allow_embedded_linebreaks = yes;
        self
    }

    pub fn allow_embedded_quotes(mut self, yes: bool) -> Self {
        self.dialect.allow_embedded_quotes = yes;
        self
    }

    /// Pads records with fewer fields than expected with nulls instead of failing.
    pub fn fill_missing_columns(mut self, yes: bool) -> Self {
        self.dialect.fill_missing_columns = yes;
        self
    }

    pub fn trim_values(mut self, yes: bool) -> Self {
        self.dialect.trim_values = yes;
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.dialect.encoding = encoding;
        self.encoding_label = None;
        self
    }

    /// Sets the encoding by its WHATWG label, resolved at `build` time.
    pub fn encoding_label(mut self, label: &str) -> Self {
        self.encoding_label = Some(label.to_string());
        self
    }

    pub fn build(self) -> CsvResult<Dialect> {
        let mut dialect = self.dialect;
        if let Some(label) = self.encoding_label {
            dialect.encoding = encoding_label::resolve(&label)?;
        }
        dialect.validate()?;
        Ok(dialect)
    }
}

impl From<Dialect> for DialectBuilder {
    fn from(dialect: Dialect) -> Self {
        Self {
            dialect,
            encoding_label: None,
        }
    }
}

mod encoding_label {
    use encoding_rs::Encoding;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use crate::error::{CsvError, CsvResult};

    pub fn resolve(label: &str) -> CsvResult<&'static Encoding> {
        Encoding::for_label(label.as_bytes())
            .ok_or_else(|| CsvError::Encoding(format!("unknown encoding label {label:?}")))
    }

    pub fn serialize<S: Serializer>(
        encoding: &&'static Encoding,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(encoding.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<&'static Encoding, D::Error> {
        let label = String::deserialize(deserializer)?;
        resolve(&label).map_err(D::Error::custom)
    }
}
