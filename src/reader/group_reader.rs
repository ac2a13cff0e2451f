//! Reader for per-window statistics lines.
//!
//! Each line is a time bucket followed by raw values, separated by commas
//! and/or whitespace. Consecutive lines with the same bucket are merged.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{Result, StatsError};
use crate::stats::{SortedGroup, TimedGroup};

pub struct GroupReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    pending: Option<(f64, Vec<f64>)>,
}

impl GroupReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| StatsError::open(path, e))?;
        Ok(Self::new(file))
    }
}

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

impl<R: Read> GroupReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            pending: None,
        }
    }

    /// Next merged group, or `Ok(None)` once the input is exhausted.
    ///
    /// A line holding only a timestamp yields a group with no values; the
    /// caller must not summarize it. Unparsable value tokens are dropped,
    /// and so are lines that are not UTF-8.
    pub fn next_group(&mut self) -> Result<Option<TimedGroup>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                break;
            }
            let Ok(line) = std::str::from_utf8(&self.buf) else {
                log::warn!("skipping stats line that is not UTF-8: {:?}", String::from_utf8_lossy(&self.buf));
                continue;
            };
            let mut toks = tokens(line);
            let Some(first) = toks.next() else {
                continue;
            };
            let Some(timestamp) = first.parse::<f64>().ok().filter(|t| t.is_finite()) else {
                log::warn!("skipping stats line without a time bucket: {:?}", line);
                continue;
            };
            let values: Vec<f64> = toks
                .filter_map(|t| t.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect();

            if let Some((ts, pending)) = self.pending.as_mut() {
                if *ts == timestamp {
                    pending.extend(values);
                    continue;
                }
            }
            if let Some(done) = self.pending.replace((timestamp, values)) {
                return Ok(Some(Self::seal(done)));
            }
        }
        Ok(self.pending.take().map(Self::seal))
    }

    fn seal((timestamp, values): (f64, Vec<f64>)) -> TimedGroup {
        TimedGroup {
            timestamp,
            values: SortedGroup::from_unsorted(values),
        }
    }
}

/// Reads every group of a stats-line file.
pub fn read_groups(path: &Path) -> Result<Vec<TimedGroup>> {
    let mut reader = GroupReader::open(path)?;
    let mut groups = Vec::new();
    while let Some(group) = reader.next_group()? {
        groups.push(group);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_each_group() {
        let mut reader = GroupReader::new("1, 30 10 20\n2,5,4\n".as_bytes());
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.timestamp, 1.0);
        assert_eq!(g.values.values(), &[10.0, 20.0, 30.0]);
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.values.values(), &[4.0, 5.0]);
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn merges_consecutive_lines_of_one_bucket() {
        let mut reader = GroupReader::new("0 3\n0 1\n0 2\n1 9\n".as_bytes());
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.values.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(reader.next_group().unwrap().unwrap().timestamp, 1.0);
    }

    #[test]
    fn empty_group_is_distinct_from_eof() {
        let mut reader = GroupReader::new("4\n\n".as_bytes());
        let g = reader.next_group().unwrap().unwrap();
        assert!(g.values.is_empty());
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn non_utf8_line_is_skipped() {
        let mut reader = GroupReader::new(&b"0 10 20\n1 \xff\n2 5 6\n"[..]);
        assert_eq!(reader.next_group().unwrap().unwrap().values.values(), &[10.0, 20.0]);
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.timestamp, 2.0);
        assert_eq!(g.values.values(), &[5.0, 6.0]);
        assert!(reader.next_group().unwrap().is_none());
    }

    #[test]
    fn bad_tokens_are_dropped() {
        let mut reader = GroupReader::new("x 1 2\n5 1 nan 2\n".as_bytes());
        let g = reader.next_group().unwrap().unwrap();
        assert_eq!(g.timestamp, 5.0);
        assert_eq!(g.values.values(), &[1.0, 2.0]);
    }
}
