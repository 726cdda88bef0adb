//! Final bucket concatenation.

use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;

use crate::pass::Generation;
use crate::sort::SortError;

/// Concatenation report.
#[derive(Debug, Default)]
pub struct ConcatReport {
    /// Bucket files copied to the output and deleted.
    pub copied: Vec<PathBuf>,
    /// Bucket files that could not be copied, kept on disk.
    pub failed: Vec<(PathBuf, io::Error)>,
}

/// Copies the terminal generation files, in bucket digit order, to the output file.
///
/// Failing to create the output is fatal. A bucket that cannot be opened or copied is logged and skipped,
/// so the output is sorted but lacks that bucket's records. Copied buckets are deleted.
///
/// # Arguments
/// * `terminal` - Generation produced by the last pass
/// * `output` - Resulting file path
/// * `buf_size` - Output write buffer size. If [`None`] the default buffer size is used.
pub fn concatenate(terminal: Generation, output: &Path, buf_size: Option<usize>) -> Result<ConcatReport, SortError> {
    let output_error = |err: io::Error| SortError::Resource {
        path: output.to_path_buf(),
        source: err,
    };

    let file = fs::File::create(output).map_err(output_error)?;
    let mut writer = match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
        None => io::BufWriter::new(file),
    };

    let mut report = ConcatReport::default();
    for path in terminal.into_files() {
        match append(&mut writer, &path) {
            Ok(bytes) => {
                log::debug!("{} appended to the output ({} bytes)", path.display(), bytes);
                if let Err(err) = fs::remove_file(&path) {
                    log::warn!("bucket file {} removal error: {}", path.display(), err);
                }
                report.copied.push(path);
            }
            Err(err) => {
                log::error!("bucket file {} concatenation error: {}", path.display(), err);
                report.failed.push((path, err));
            }
        }
    }

    writer.flush().map_err(output_error)?;

    return Ok(report);
}

fn append(writer: &mut impl Write, path: &Path) -> io::Result<u64> {
    let mut bucket = fs::File::open(path)?;

    io::copy(&mut bucket, writer)
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::concatenate;
    use crate::digit::{DigitCodec, KeyWidth};
    use crate::pass::{run_pass, Generation, PassContext};
    use crate::sort::SortError;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn terminal_generation(dir: &std::path::Path) -> Generation {
        let ctx = PassContext {
            codec: DigitCodec::new(KeyWidth::new(1).unwrap()),
            work_dir: dir.to_path_buf(),
            rw_buf_size: None,
        };
        let input = dir.join("input.txt");
        fs::write(&input, "7\n3\n9\n3\n0\n").unwrap();

        run_pass(&ctx, 0, Generation::initial(&input)).unwrap().generation
    }

    #[rstest]
    fn test_concatenate(tmp_dir: tempfile::TempDir) {
        let terminal = terminal_generation(tmp_dir.path());
        let buckets = terminal.files().to_vec();
        let output = tmp_dir.path().join("output.txt");

        let report = concatenate(terminal, &output, None).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "0\r\n3\r\n3\r\n7\r\n9\r\n");
        assert_eq!(report.copied, buckets);
        assert!(report.failed.is_empty());
        assert!(buckets.iter().all(|path| !path.exists()));
    }

    #[rstest]
    fn test_concatenate_missing_bucket(tmp_dir: tempfile::TempDir) {
        let terminal = terminal_generation(tmp_dir.path());
        let missing = terminal.files()[3].clone();
        fs::remove_file(&missing).unwrap();
        let output = tmp_dir.path().join("output.txt");

        let report = concatenate(terminal, &output, Some(8)).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "0\r\n7\r\n9\r\n");
        assert_eq!(report.copied.len(), 9);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, missing);
    }

    #[rstest]
    fn test_output_creation_failure(tmp_dir: tempfile::TempDir) {
        let terminal = terminal_generation(tmp_dir.path());
        let output = tmp_dir.path().join("missing").join("output.txt");

        let result = concatenate(terminal, &output, None);

        assert!(matches!(result, Err(SortError::Resource { .. })));
    }
}
