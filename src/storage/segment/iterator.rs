//! Segment Iterator
//!
//! Sequential iteration over all records of a segment.

use std::io::BufReader;

use crate::codec::{self, LogEntry};
use crate::error::Result;

use super::reader::PositionedReader;

/// Iterator over segment records in ascending key order
///
/// Stops after the first error.
pub struct SegmentIterator<'a> {
    reader: BufReader<PositionedReader<'a>>,
    done: bool,
}

impl<'a> SegmentIterator<'a> {
    pub(super) fn new(reader: BufReader<PositionedReader<'a>>) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl Iterator for SegmentIterator<'_> {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match codec::decode_next(&mut self.reader) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
