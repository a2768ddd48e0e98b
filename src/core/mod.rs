/// Byte-order mark detection.
pub mod bom;

/// Dialect configuration shared by readers and writers.
pub mod dialect;

/// Record types and the reader / writer traits.
pub mod item;

/// Character scan engine with one character of pushback.
pub mod scanner;
