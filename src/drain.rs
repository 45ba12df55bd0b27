use crate::ring_buffer::RingBuffer;
use std::io;

/// Outcome of a complete drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drained {
    /// Bytes written, always equal to the buffer size at drain time
    pub bytes: usize,
    /// The contents were written as two segments
    pub wrapped: bool,
}

/// A drain that did not get every buffered byte out
#[derive(Debug)]
pub struct ShortDrain {
    /// Bytes the writer accepted before stopping
    pub written: usize,
    /// Bytes buffered when the drain started
    pub expected: usize,
    /// Error reported by the writer, if the short count came from one
    pub source: Option<io::Error>,
}

/// Write the logical contents of `buf` through `write` in FIFO order
///
/// Contents that wrap past the end of the backing array go out as two
/// linear writes, `storage[tail..N]` then `storage[..head]`. A full buffer
/// with `tail > 0` has `head == tail` and is handled as wrapped.
///
/// The buffer itself is not modified; resetting it after a successful drain
/// is up to the caller. Writing stops at the first short segment so a
/// partial drain never leaves the second segment ahead of the first.
pub fn drain<F, const N: usize>(
    buf: &RingBuffer<N>,
    mut write: F,
) -> Result<Drained, ShortDrain>
where
    F: FnMut(&[u8]) -> io::Result<usize>,
{
    let expected = buf.size();
    let head = buf.head();
    let tail = buf.tail();
    let storage = buf.storage();

    let wrapped = head < tail || (tail > 0 && expected == buf.capacity());
    let segments: [&[u8]; 2] = if wrapped {
        [&storage[tail..], &storage[..head]]
    } else {
        [&storage[tail..tail + expected], &[]]
    };

    let mut written = 0;
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        match write(segment) {
            Ok(n) => {
                written += n;
                if n < segment.len() {
                    break;
                }
            }
            Err(e) => {
                return Err(ShortDrain {
                    written,
                    expected,
                    source: Some(e),
                })
            }
        }
    }

    if written != expected {
        return Err(ShortDrain {
            written,
            expected,
            source: None,
        });
    }

    Ok(Drained {
        bytes: written,
        wrapped,
    })
}
