use log::info;

use crate::{
    core::item::{RecordWriter, Value},
    error::CsvResult,
};

/// A `RecordWriter` that logs every record at info level.
///
/// Useful to trace what a pipeline would export without producing a file.
#[derive(Default)]
pub struct LoggerWriter {}

impl RecordWriter for LoggerWriter {
    fn write(&self, record: &[Value]) -> CsvResult<()> {
        info!("Record:{:?}", record);
        Ok(())
    }

    fn flush(&self) -> CsvResult<()> {
        Ok(())
    }
}
