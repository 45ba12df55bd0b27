use crate::drain::{drain, ShortDrain};
use crate::error::{LogError, Result};
use crate::logger::BUFFER_SIZE;
use crate::ring_buffer::RingBuffer;
use crate::sink::LogSink;
use std::fmt;
use std::io;
use tracing::debug;

/// Ring-buffered logger draining into any `io::Write`
///
/// Meant for console or serial outputs: bytes pile up in an `N`-byte ring
/// buffer and go out in FIFO order on `flush`. A failed flush is final
/// until `clear`, like [`BufferedFileLogger`](crate::BufferedFileLogger).
pub struct StreamLogger<W: io::Write, const N: usize = BUFFER_SIZE> {
    writer: W,
    buffer: RingBuffer<N>,
    written: u64,
    failed: Option<&'static str>,
}

impl<W: io::Write, const N: usize> StreamLogger<W, N> {
    /// Buffer in front of `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: RingBuffer::new(),
            written: 0,
            failed: None,
        }
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Give back the writer, dropping anything not yet flushed
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write, const N: usize> LogSink for StreamLogger<W, N> {
    fn size(&self) -> u64 {
        self.written
    }

    /// Streams are unbounded
    fn capacity(&self) -> u64 {
        u64::MAX
    }

    #[inline]
    fn put_byte(&mut self, byte: u8) {
        self.buffer.put(byte);
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(failed) = self.failed {
            return Err(LogError::Latched { failed });
        }
        let writer = &mut self.writer;
        let drained = drain(&self.buffer, |segment| writer.write(segment)).map_err(
            |ShortDrain {
                 written,
                 expected,
                 source,
             }| LogError::ShortWrite {
                which: "stream",
                written,
                expected,
                fault: None,
                source,
            },
        );
        let drained = match drained {
            Ok(drained) => drained,
            Err(err) => {
                self.failed = Some("write");
                return Err(err);
            }
        };
        if drained.bytes == 0 {
            return Ok(());
        }

        if let Err(source) = self.writer.flush() {
            self.failed = Some("sync");
            return Err(LogError::Sync { fault: None, source });
        }
        self.buffer.reset();
        self.written += drained.bytes as u64;
        debug!(
            bytes = drained.bytes,
            wrapped = drained.wrapped,
            "Drained buffer to stream"
        );
        Ok(())
    }

    fn clear(&mut self) {
        self.buffer.reset();
        self.failed = None;
    }

    fn internal_size(&self) -> usize {
        self.buffer.size()
    }

    fn internal_capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl<W: io::Write, const N: usize> fmt::Write for StreamLogger<W, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    /// Accepts at most `limit` bytes per call
    struct Trickle {
        out: Vec<u8>,
        limit: usize,
    }

    impl io::Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stream_flush_in_order() {
        let mut logger = StreamLogger::<Vec<u8>, 4>::new(Vec::new());
        write!(logger, "abcdef").unwrap();
        logger.flush().unwrap();
        assert_eq!(logger.get_ref(), b"cdef");
        assert_eq!(logger.size(), 4);
        assert_eq!(logger.internal_size(), 0);
        assert_eq!(logger.staging(), None);
    }

    #[test]
    fn test_stream_short_write_keeps_buffer() {
        let mut logger = StreamLogger::<_, 8>::new(Trickle {
            out: Vec::new(),
            limit: 2,
        });
        logger.put_bytes(b"hello");
        let err = logger.flush().unwrap_err();
        assert!(matches!(
            err,
            LogError::ShortWrite { written: 2, expected: 5, .. }
        ));
        assert_eq!(logger.internal_size(), 5);
        assert_eq!(logger.size(), 0);

        assert!(matches!(
            logger.flush(),
            Err(LogError::Latched { failed: "write" })
        ));
        assert_eq!(logger.get_ref().out, b"he");

        logger.clear();
        logger.put_bytes(b"ok");
        logger.flush().unwrap();
        assert_eq!(logger.into_inner().out, b"heok");
    }
}
