//! Bucket file set.
//!
//! Every pass writes its records into ten bucket files, one per decimal digit.
//! The files of one pass form a set that is opened, filled and closed as a unit.

use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;

use crate::sort::SortError;

/// Number of buckets per pass, one per decimal digit.
pub const BUCKETS: usize = 10;

/// Intermediate bucket record terminator.
const RECORD_TERMINATOR: &[u8] = b"\r\n";

/// Returns bucket file paths of the pass ordered by bucket digit.
/// Names are deterministic: `pass<pass_index>_<digit>.txt`.
///
/// # Arguments
/// * `dir` - Directory the bucket files are placed in
/// * `pass_index` - Index of the pass the buckets belong to
pub fn bucket_paths(dir: &Path, pass_index: usize) -> Vec<PathBuf> {
    Vec::from_iter((0..BUCKETS).map(|digit| dir.join(format!("pass{}_{}.txt", pass_index, digit))))
}

/// Write endpoints of one pass's bucket files, indexable by bucket digit.
/// Writers are closed when the set is dropped, so every exit path releases the handles.
pub struct BucketWriters {
    paths: Vec<PathBuf>,
    writers: Vec<io::BufWriter<fs::File>>,
}

impl BucketWriters {
    /// Creates (truncating existing ones) and opens every bucket file.
    /// If any file cannot be created the already opened ones are closed and an error is returned.
    ///
    /// # Arguments
    /// * `paths` - Bucket file paths ordered by bucket digit
    /// * `buf_size` - Write buffer size. If [`None`] the default buffer size is used.
    pub fn open(paths: Vec<PathBuf>, buf_size: Option<usize>) -> Result<Self, SortError> {
        if paths.len() != BUCKETS {
            return Err(SortError::Internal(format!(
                "bucket set must have {} files, got {}",
                BUCKETS,
                paths.len()
            )));
        }

        let mut writers = Vec::with_capacity(BUCKETS);
        for path in paths.iter() {
            // on error `writers` is dropped here, closing every file opened so far
            let file = fs::File::create(path).map_err(|err| SortError::Resource {
                path: path.clone(),
                source: err,
            })?;

            writers.push(match buf_size {
                Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
                None => io::BufWriter::new(file),
            });
        }

        log::debug!("bucket set opened ({} .. {})", paths[0].display(), paths[BUCKETS - 1].display());

        return Ok(BucketWriters { paths, writers });
    }

    /// Appends an encoded key followed by the record terminator to the bucket of the digit.
    pub fn write_record(&mut self, digit: usize, encoded: &str) -> Result<(), SortError> {
        let writer = self
            .writers
            .get_mut(digit)
            .ok_or_else(|| SortError::Internal(format!("bucket index {} is out of range", digit)))?;

        writer
            .write_all(encoded.as_bytes())
            .and_then(|_| writer.write_all(RECORD_TERMINATOR))
            .map_err(|err| SortError::Resource {
                path: self.paths[digit].clone(),
                source: err,
            })
    }

    /// Flushes and closes every bucket file, including those that received no records.
    /// Returns the bucket paths ordered by digit.
    pub fn close(self) -> Result<Vec<PathBuf>, SortError> {
        let BucketWriters { paths, writers } = self;

        let mut first_error = None;
        for (writer, path) in writers.into_iter().zip(paths.iter()) {
            if let Err(err) = writer.into_inner().map_err(|err| err.into_error()) {
                log::error!("bucket file {} flushing error: {}", path.display(), err);
                first_error.get_or_insert(SortError::Resource {
                    path: path.clone(),
                    source: err,
                });
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        return Ok(paths);
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rstest::*;

    use super::{bucket_paths, BucketWriters, BUCKETS};
    use crate::sort::SortError;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_bucket_paths() {
        let paths = bucket_paths(Path::new("out"), 3);

        assert_eq!(paths.len(), BUCKETS);
        assert_eq!(paths[0], Path::new("out").join("pass3_0.txt"));
        assert_eq!(paths[9], Path::new("out").join("pass3_9.txt"));
        assert_eq!(paths, bucket_paths(Path::new("out"), 3));
    }

    #[rstest]
    fn test_bucket_writers(tmp_dir: tempfile::TempDir) {
        let mut writers = BucketWriters::open(bucket_paths(tmp_dir.path(), 0), None).unwrap();
        writers.write_record(5, "503210").unwrap();
        writers.write_record(0, "000001").unwrap();
        writers.write_record(5, "503100").unwrap();
        let paths = writers.close().unwrap();

        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "000001\r\n");
        assert_eq!(fs::read_to_string(&paths[5]).unwrap(), "503210\r\n503100\r\n");
        for digit in [1, 2, 3, 4, 6, 7, 8, 9] {
            assert_eq!(fs::read_to_string(&paths[digit]).unwrap(), "");
        }
    }

    #[rstest]
    fn test_existing_buckets_truncated(tmp_dir: tempfile::TempDir) {
        let paths = bucket_paths(tmp_dir.path(), 1);
        fs::write(&paths[2], "stale\r\n").unwrap();

        let writers = BucketWriters::open(paths, Some(16)).unwrap();
        let paths = writers.close().unwrap();

        assert_eq!(fs::read_to_string(&paths[2]).unwrap(), "");
    }

    #[rstest]
    fn test_bucket_index_out_of_range(tmp_dir: tempfile::TempDir) {
        let mut writers = BucketWriters::open(bucket_paths(tmp_dir.path(), 0), None).unwrap();

        assert!(matches!(writers.write_record(10, "123456"), Err(SortError::Internal(_))));
    }

    #[rstest]
    fn test_open_failure(tmp_dir: tempfile::TempDir) {
        let missing = tmp_dir.path().join("missing");

        let result = BucketWriters::open(bucket_paths(&missing, 0), None);

        match result {
            Err(SortError::Resource { path, .. }) => assert_eq!(path, missing.join("pass0_0.txt")),
            _ => panic!("resource error expected"),
        }
    }

    #[rstest]
    fn test_partial_open_failure(tmp_dir: tempfile::TempDir) {
        let mut paths = bucket_paths(tmp_dir.path(), 0);
        paths[4] = tmp_dir.path().join("missing").join("pass0_4.txt");

        let result = BucketWriters::open(paths.clone(), None);

        assert!(matches!(result, Err(SortError::Resource { .. })));
        // files opened before the failure were created and released
        assert!(paths[0].exists());
        assert!(fs::remove_file(&paths[3]).is_ok());
        assert!(!paths[5].exists());
    }
}
