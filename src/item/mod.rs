#[cfg(feature = "logger")]
/// This module provides a logging record writer, useful for debugging.
pub mod logger;

#[cfg(feature = "csv")]
/// This module provides the CSV record reader and writer.
pub mod csv;
