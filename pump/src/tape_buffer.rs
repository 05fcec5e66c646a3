use std::io::{self, Write};

/// Record-aligned write buffer for the local mover (`§4.5`).
///
/// Bytes handed to [`TapeBuffer::write_through`] accumulate until a full
/// record is assembled, at which point the whole record is written to the
/// tape in one call. The final partial record of a backup is never written
/// implicitly — callers must call [`TapeBuffer::flush_zero_length`], which
/// zero-pads the remainder, matching property 5 of the testable properties.
pub struct TapeBuffer {
    buf: Vec<u8>,
    cursor: usize,
    record_size: usize,
}

impl TapeBuffer {
    pub fn new(record_size: usize) -> Self {
        assert!(record_size > 0, "record size must be nonzero");
        Self {
            buf: vec![0; record_size],
            cursor: 0,
            record_size,
        }
    }

    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Bytes already buffered toward the next record.
    pub const fn pending(&self) -> usize {
        self.cursor
    }

    /// Buffers `data`, writing each record to `tape` as soon as it fills.
    pub fn write_through(&mut self, tape: &mut impl Write, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            let space = self.record_size - self.cursor;
            let take = space.min(data.len());
            self.buf[self.cursor..self.cursor + take].copy_from_slice(&data[..take]);
            self.cursor += take;
            data = &data[take..];
            if self.cursor == self.record_size {
                tape.write_all(&self.buf)?;
                self.cursor = 0;
            }
        }
        Ok(())
    }

    /// Forces out a partial record, zero-padded to `record_size`. A no-op if
    /// nothing is buffered — called unconditionally from the LOCAL+SUCCESSFUL
    /// halt path (`SPEC_FULL.md` §2B), so it must tolerate an already-flushed
    /// buffer.
    pub fn flush_zero_length(&mut self, tape: &mut impl Write) -> io::Result<()> {
        if self.cursor == 0 {
            return Ok(());
        }
        for byte in &mut self.buf[self.cursor..] {
            *byte = 0;
        }
        tape.write_all(&self.buf)?;
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_through_flushes_only_on_full_records() {
        let mut tape = Vec::new();
        let mut buffer = TapeBuffer::new(4);
        buffer.write_through(&mut tape, &[1, 2]).unwrap();
        assert!(tape.is_empty());
        assert_eq!(buffer.pending(), 2);

        buffer.write_through(&mut tape, &[3, 4, 5]).unwrap();
        assert_eq!(tape, vec![1, 2, 3, 4]);
        assert_eq!(buffer.pending(), 1);
    }

    #[test]
    fn flush_zero_length_pads_partial_record() {
        let mut tape = Vec::new();
        let mut buffer = TapeBuffer::new(4);
        buffer.write_through(&mut tape, &[9]).unwrap();
        buffer.flush_zero_length(&mut tape).unwrap();
        assert_eq!(tape, vec![9, 0, 0, 0]);
        assert_eq!(buffer.pending(), 0);
    }

    #[test]
    fn flush_zero_length_is_noop_on_empty_buffer() {
        let mut tape = Vec::new();
        let mut buffer = TapeBuffer::new(4);
        buffer.flush_zero_length(&mut tape).unwrap();
        assert!(tape.is_empty());
    }

    #[test]
    fn write_through_spans_multiple_records() {
        let mut tape = Vec::new();
        let mut buffer = TapeBuffer::new(2);
        buffer.write_through(&mut tape, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(tape, vec![1, 2, 3, 4]);
        assert_eq!(buffer.pending(), 1);
    }
}
