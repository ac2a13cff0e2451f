//! Fixed-arity delimited record reader.
//!
//! Every line becomes `[T; N]`. Fields beyond `N` are ignored; what happens
//! to missing or unparsable fields is decided by [`ParsePolicy`].

use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::settings::ParsePolicy;
use crate::error::{Result, StatsError};

/// Field types a record can hold.
pub trait Numeric: Copy + Default + FromStr {}

impl Numeric for i64 {}
impl Numeric for f64 {}

pub struct RecordReader<R, T, const N: usize> {
    path: PathBuf,
    records: csv::StringRecordsIntoIter<R>,
    policy: ParsePolicy,
    skipped: usize,
    _fields: PhantomData<T>,
}

fn builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

impl<T: Numeric, const N: usize> RecordReader<File, T, N> {
    /// Failing to open `path` is fatal for the caller.
    pub fn open(path: &Path, delimiter: u8, policy: ParsePolicy) -> Result<Self> {
        let file = File::open(path).map_err(|e| StatsError::open(path, e))?;
        Ok(Self::from_reader(path, file, delimiter, policy))
    }
}

impl<R: Read, T: Numeric, const N: usize> RecordReader<R, T, N> {
    pub fn from_reader(path: &Path, reader: R, delimiter: u8, policy: ParsePolicy) -> Self {
        Self {
            path: path.to_path_buf(),
            records: builder(delimiter).from_reader(reader).into_records(),
            policy,
            skipped: 0,
            _fields: PhantomData,
        }
    }

    /// Records dropped so far (unreadable rows, or bad fields under `SkipRecord`).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse(&self, record: &csv::StringRecord) -> Option<[T; N]> {
        let mut fields = [T::default(); N];
        for (i, slot) in fields.iter_mut().enumerate() {
            match record.get(i).and_then(|s| s.parse::<T>().ok()) {
                Some(v) => *slot = v,
                None if self.policy == ParsePolicy::SkipRecord => return None,
                None => {}
            }
        }
        Some(fields)
    }
}

impl<R: Read, T: Numeric, const N: usize> Iterator for RecordReader<R, T, N> {
    type Item = [T; N];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    log::error!("read failed in {}: {}", self.path.display(), e);
                    return None;
                }
                Err(e) => {
                    log::warn!("skipping unreadable record in {}: {}", self.path.display(), e);
                    self.skipped += 1;
                    continue;
                }
            };

            match self.parse(&record) {
                Some(fields) => return Some(fields),
                None => {
                    log::debug!(
                        "skipping malformed record at line {} in {}",
                        record.position().map_or(0, |p| p.line()),
                        self.path.display()
                    );
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Number of fields in the first record, `None` for an empty file.
pub fn field_count(path: &Path, delimiter: u8) -> Result<Option<usize>> {
    let file = File::open(path).map_err(|e| StatsError::open(path, e))?;
    let mut records = builder(delimiter).from_reader(file).into_records();
    match records.next() {
        Some(Ok(record)) => Ok(Some(record.len())),
        Some(Err(e)) => Err(StatsError::csv(path, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read<T: Numeric, const N: usize>(input: &str, delimiter: u8, policy: ParsePolicy) -> Vec<[T; N]> {
        RecordReader::<_, T, N>::from_reader(Path::new("test.csv"), input.as_bytes(), delimiter, policy)
            .collect()
    }

    #[test]
    fn reads_pipe_delimited_integers() {
        let rows: Vec<[i64; 3]> = read("1|2|3\n4|5|6\n", b'|', ParsePolicy::ZeroFill);
        assert_eq!(rows, vec![[1, 2, 3], [4, 5, 6]]);
    }

    #[test]
    fn zero_fill_keeps_malformed_records() {
        let rows: Vec<[i64; 3]> = read("1,x,3\n4,5\n", b',', ParsePolicy::ZeroFill);
        assert_eq!(rows, vec![[1, 0, 3], [4, 5, 0]]);
    }

    #[test]
    fn skip_record_drops_malformed_records() {
        let mut reader = RecordReader::<_, i64, 3>::from_reader(
            Path::new("test.csv"),
            "1,x,3\n4,5\n7,8,9\n".as_bytes(),
            b',',
            ParsePolicy::SkipRecord,
        );
        assert_eq!(reader.next(), Some([7, 8, 9]));
        assert_eq!(reader.next(), None);
        assert_eq!(reader.skipped(), 2);
    }

    #[test]
    fn extra_fields_and_spaces_are_tolerated() {
        let rows: Vec<[f64; 2]> = read(" 1.5 , 2000 ,extra\n", b',', ParsePolicy::SkipRecord);
        assert_eq!(rows, vec![[1.5, 2000.0]]);
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = RecordReader::<_, i64, 2>::open(Path::new("/nonexistent/quic-relay-x.csv"), b'|', ParsePolicy::ZeroFill)
            .err()
            .unwrap();
        assert!(matches!(err, StatsError::Open { .. }));
    }

    #[test]
    fn counts_fields_of_first_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.csv");
        std::fs::write(&path, "1,2,3,4,5,6,7,8,9\n1,2\n").unwrap();
        assert_eq!(field_count(&path, b',').unwrap(), Some(9));

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "").unwrap();
        assert_eq!(field_count(&empty, b',').unwrap(), None);
    }
}
