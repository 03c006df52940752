//! # Read cursor of a tail worker.
//!
//! [`TailCursor`] tracks how far a file has been reported and how long it was last seen.
//!
//! ## Rules
//! - `byte_offset` only ever points just past a line terminator (or at the initial EOF),
//!   never into a partial line. Partial trailing bytes are re-read from disk on the next
//!   step instead of being buffered in memory.
//! - `byte_offset` never decreases except through a truncation reset.
//! - Fields are written only after a step fully succeeds; a failing step leaves the
//!   cursor exactly as it was.
//!
//! ```text
//! file:   |hello\nwor|ld\n|partial
//!                   ^     ^       ^
//!          byte_offset    |       last_known_length
//!                  (after consume: offset moves to here)
//! ```

use crate::error::Fault;

/// Read position and last observed length of a tailed file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TailCursor {
    byte_offset: u64,
    last_known_length: u64,
}

impl TailCursor {
    /// Cursor positioned at `len`, so only content appended from now on is reported.
    pub(crate) fn at_end(len: u64) -> Self {
        Self {
            byte_offset: len,
            last_known_length: len,
        }
    }

    pub(crate) fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    pub(crate) fn last_known_length(&self) -> u64 {
        self.last_known_length
    }

    /// Compares the current file length against the last observed one.
    ///
    /// Returns `true` (and rewinds to 0) when the file shrank.
    pub(crate) fn observe_length(&mut self, len: u64) -> bool {
        if len < self.last_known_length {
            self.byte_offset = 0;
            self.last_known_length = 0;
            true
        } else {
            false
        }
    }

    /// Number of bytes between the cursor and `len`.
    pub(crate) fn pending(&self, len: u64) -> Result<usize, Fault> {
        let n = len.checked_sub(self.byte_offset).ok_or_else(|| {
            Fault::arithmetic(format!(
                "length {len} is behind cursor offset {}",
                self.byte_offset
            ))
        })?;
        usize::try_from(n).map_err(|_| Fault::arithmetic(format!("{n} bytes do not fit in memory")))
    }

    /// Consumes `chunk`, which starts at the cursor offset.
    ///
    /// Returns every complete line in order and advances past the last terminator.
    /// A trailing `\r` is stripped; invalid UTF-8 is replaced lossily.
    pub(crate) fn consume(&mut self, chunk: &[u8]) -> Result<Vec<String>, Fault> {
        let start = self.byte_offset;
        let seen = u64::try_from(chunk.len())
            .ok()
            .and_then(|n| start.checked_add(n))
            .ok_or_else(|| Fault::arithmetic("read length overflows the file offset"))?;

        let Some(last_nl) = chunk.iter().rposition(|b| *b == b'\n') else {
            self.last_known_length = self.last_known_length.max(seen);
            return Ok(Vec::new());
        };

        let complete = &chunk[..last_nl];
        let lines = complete
            .split(|b| *b == b'\n')
            .map(|raw| {
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                String::from_utf8_lossy(raw).into_owned()
            })
            .collect();

        self.byte_offset = start + last_nl as u64 + 1;
        self.last_known_length = self.last_known_length.max(seen);
        Ok(lines)
    }

    /// Records the observed length when there was nothing to read.
    pub(crate) fn settle(&mut self, len: u64) {
        self.last_known_length = self.last_known_length.max(len);
    }
}
