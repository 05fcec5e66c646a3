use std::io::{self, Read};

/// Record-aligned read buffer for the local mover (`§4.5`).
///
/// Each refill reads one full record (or a short final record at EOF) from
/// the tape and serves bytes out of it until exhausted, so the caller sees a
/// byte stream regardless of how the DMA sliced its read requests.
pub struct TapeReader {
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    record_size: usize,
}

impl TapeReader {
    pub fn new(record_size: usize) -> Self {
        assert!(record_size > 0, "record size must be nonzero");
        Self {
            buf: vec![0; record_size],
            pos: 0,
            filled: 0,
            record_size,
        }
    }

    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Fills `out` from the buffered record, refilling from `tape` as
    /// needed. Returns `0` only at true tape EOF.
    pub fn read(&mut self, tape: &mut impl Read, out: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.filled {
            self.filled = tape.read(&mut self.buf)?;
            self.pos = 0;
            if self.filled == 0 {
                return Ok(0);
            }
        }
        let available = self.filled - self.pos;
        let take = available.min(out.len());
        out[..take].copy_from_slice(&self.buf[self.pos..self.pos + take]);
        self.pos += take;
        Ok(take)
    }

    /// Discards whatever is left of the record currently buffered, forcing
    /// the next `read` to pull a fresh record from the tape. Used when a
    /// seek repositions the tape out from under a partially-consumed record.
    pub fn discard_buffered(&mut self) {
        self.pos = self.filled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_serves_bytes_across_record_boundaries() {
        let mut tape = Cursor::new(vec![1, 2, 3, 4, 5, 6]);
        let mut reader = TapeReader::new(4);
        let mut out = [0u8; 3];

        let n = reader.read(&mut tape, &mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(out, [1, 2, 3]);

        let n = reader.read(&mut tape, &mut out).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out[..1], [4]);

        let n = reader.read(&mut tape, &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out[..2], [5, 6]);
    }

    #[test]
    fn read_returns_zero_at_tape_eof() {
        let mut tape = Cursor::new(Vec::new());
        let mut reader = TapeReader::new(4);
        let mut out = [0u8; 4];
        assert_eq!(reader.read(&mut tape, &mut out).unwrap(), 0);
    }

    #[test]
    fn discard_buffered_forces_refill() {
        let mut tape = Cursor::new(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let mut reader = TapeReader::new(4);
        let mut out = [0u8; 2];
        reader.read(&mut tape, &mut out).unwrap();
        reader.discard_buffered();
        let n = reader.read(&mut tape, &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, [5, 6]);
    }
}
