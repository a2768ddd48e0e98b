#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 <div align="center">
   <h1>csv-codec-rs</h1>
   <h3>A streaming delimited-text codec with configurable dialects</h3>

   ![license](https://shields.io/badge/license-MIT%2FApache--2.0-blue)

  </div>

 # csv-codec-rs

 A character-level CSV parser and its symmetric writer. Input is decoded from
 any byte stream with a declared encoding, scanned one character at a time and
 turned into records of nullable strings by an explicit state machine. The
 writer produces text the reader parses back to the same fields.

 ## Core Concepts

- **Dialect:** the separator, quote and escape characters of a stream, plus its
  policies (embedded linebreaks and quotes, trailing-column filling, trimming)
  and its encoding.
- **Scanner:** decodes bytes to characters, skips a byte-order mark and offers
  one character of pushback and escape-aware scanning.
- **CsvRecordReader:** a session over one stream and one dialect. Records are
  pulled one at a time or all at once; the first non-empty record sets the
  number of columns every later record must have.
- **CsvRecordWriter:** serializes tagged values with a quoting policy
  (`Always`, `StringsOnly`, `IfNeeded`, `Never`).

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| csv           | Enables the CSV `RecordReader` and `RecordWriter` (default)   |
| logger        | Enables a logger `RecordWriter`, useful for debugging purposes |
| full          | Enables all available features                                |

 ## Getting Started

```rust
use csv_codec::{
    core::{dialect::DialectBuilder, item::Value},
    error::CsvError,
    item::csv::{csv_reader::CsvRecordReaderBuilder, csv_writer::CsvRecordWriterBuilder},
};

fn main() -> Result<(), CsvError> {
    let dialect = DialectBuilder::new()
        .separator(';')
        .fill_missing_columns(true)
        .build()?;

    let writer = CsvRecordWriterBuilder::new()
        .dialect(dialect.clone())
        .from_writer(vec![])?;
    writer.write(&[Value::from("Porsche"), Value::from("356; \"Speedster\""), Value::from(1948)])?;
    let data = writer.into_inner()?;

    let reader = CsvRecordReaderBuilder::new()
        .dialect(dialect)
        .from_reader(data.as_slice())?;

    let record = reader.read()?.unwrap();
    assert_eq!(record[1].as_deref(), Some("356; \"Speedster\""));
    assert!(reader.read()?.is_none());

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 */

/// Core module: dialect, scan engine and record types
pub mod core;

/// Error types for codec operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of record readers / writers (for example: csv reader and writer)
pub mod item;
