//! CSV support for reading and writing delimited records.
//!
//! This module provides a streaming reader and a symmetric writer driven by a
//! [`Dialect`](crate::core::dialect::Dialect): separator, quote and escape
//! characters, linebreak and quote policies, trimming and encoding.
//!
//! # Module Architecture
//!
//! The CSV module consists of three components:
//!
//! 1. **grammar**: the record grammar as a finite-state machine. Every
//!    character is classified (separator, quote, escape, CR, LF, other) and a
//!    transition table maps the current state and class to an action.
//!
//! 2. **CsvRecordReader**: pulls characters from the
//!    [`Scanner`](crate::core::scanner::Scanner), runs the grammar and enforces
//!    column-count consistency. Records are lists of nullable strings.
//!
//! 3. **CsvRecordWriter**: serializes tagged [`Value`](crate::core::item::Value)s
//!    with a configurable [`QuotePolicy`](crate::core::dialect::QuotePolicy),
//!    escaping quotes the way the reader unescapes them.
//!
//! Both the reader and the writer are configured through builders.
//!
//! # Round trips
//!
//! Records written with `QuotePolicy::IfNeeded` read back unchanged with the
//! same dialect, except that `Value::Null` reads back as an empty string.
//!
//! # Examples
//!
//! ## Reading from CSV
//!
//! ```
//! use csv_codec::item::csv::csv_reader::CsvRecordReaderBuilder;
//!
//! let csv_data = "\
//! city,country,pop
//! Boston,United States,4628910
//! \"Concord, MA\",United States,42695
//! ";
//!
//! let reader = CsvRecordReaderBuilder::new()
//!     .has_headers(true)
//!     .from_reader(csv_data.as_bytes())
//!     .unwrap();
//!
//! let records = reader.read_all().unwrap();
//!
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1][0].as_deref(), Some("Concord, MA"));
//! assert_eq!(records[1][2].as_deref(), Some("42695"));
//! ```
//!
//! ## Writing to CSV
//!
//! ```
//! use csv_codec::core::item::Value;
//! use csv_codec::item::csv::csv_writer::CsvRecordWriterBuilder;
//!
//! let writer = CsvRecordWriterBuilder::new()
//!     .headers(&["name", "age", "occupation"])
//!     .from_writer(vec![])
//!     .unwrap();
//!
//! writer.write(&[Value::from("Alice"), Value::from(28), Value::from("Engineer")]).unwrap();
//! writer.write(&[Value::from("Bob"), Value::from(35), Value::from("Designer, UX")]).unwrap();
//!
//! let csv_output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(
//!     csv_output,
//!     "name,age,occupation\nAlice,28,Engineer\nBob,35,\"Designer, UX\"\n"
//! );
//! ```

/// Record grammar: states, character classes and transitions.
mod grammar;

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;
