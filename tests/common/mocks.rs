//! Mock versions of the byte streams behind readers and writers.
use mockall::mock;

use std::io::{self, Read, Write};

mock! {
    pub Source {}
    impl Read for Source {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    }
}

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}
