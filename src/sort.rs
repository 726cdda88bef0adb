//! On-disk radix sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::bucket::bucket_paths;
use crate::concat::concatenate;
use crate::digit::{CodecError, DigitCodec, KeyWidth};
use crate::pass::{run_pass, Generation, PassContext};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Invalid sorter configuration.
    Config(String),
    /// Input file opening or reading error.
    Input { path: PathBuf, source: io::Error },
    /// Malformed record.
    Decode {
        path: PathBuf,
        line: usize,
        source: CodecError,
    },
    /// Intermediate or output file creation, writing or removal error.
    Resource { path: PathBuf, source: io::Error },
    /// Internal consistency violation. Indicates a defect, not a data problem.
    Internal(String),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::Config(_) => None,
            SortError::Input { source, .. } => Some(source),
            SortError::Decode { source, .. } => Some(source),
            SortError::Resource { source, .. } => Some(source),
            SortError::Internal(_) => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(msg) => write!(f, "sorter configuration error: {}", msg),
            SortError::Input { path, source } => write!(f, "input file {} error: {}", path.display(), source),
            SortError::Decode { path, line, source } => {
                write!(f, "malformed record at {}:{}: {}", path.display(), line, source)
            }
            SortError::Resource { path, source } => write!(f, "file {} I/O error: {}", path.display(), source),
            SortError::Internal(msg) => write!(f, "internal consistency failure: {}", msg),
        }
    }
}

/// Sort run report.
#[derive(Debug)]
pub struct SortReport {
    /// Number of records read from the input.
    pub records: u64,
    /// Terminal bucket files that could not be appended to the output.
    pub skipped_buckets: Vec<PathBuf>,
}

/// On-disk radix sorter builder. Provides methods for [`DiskRadixSorter`] initialization.
#[derive(Clone, Default)]
pub struct DiskRadixSorterBuilder {
    /// Number of decimal digits per key.
    key_width: Option<usize>,
    /// Directory to be used to store bucket files.
    work_dir: Option<Box<Path>>,
    /// Bucket file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl DiskRadixSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        DiskRadixSorterBuilder::default()
    }

    /// Builds a [`DiskRadixSorter`] instance using provided configuration.
    pub fn build(self) -> Result<DiskRadixSorter, SortError> {
        DiskRadixSorter::new(self.key_width, self.work_dir.as_deref(), self.rw_buf_size)
    }

    /// Sets number of decimal digits per key.
    pub fn with_key_width(mut self, key_width: usize) -> DiskRadixSorterBuilder {
        self.key_width = Some(key_width);
        return self;
    }

    /// Sets directory to be used to store bucket files.
    pub fn with_work_dir(mut self, path: &Path) -> DiskRadixSorterBuilder {
        self.work_dir = Some(path.into());
        return self;
    }

    /// Sets bucket files read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> DiskRadixSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

/// On-disk radix sorter.
///
/// Sorts a text file of fixed-width decimal keys, one per line, without loading it into memory.
/// Each of the `width` passes re-partitions the whole data set into ten bucket files by a single digit,
/// going from the least significant digit to the most significant one. The buckets of the last pass are
/// concatenated in digit order into the output file.
pub struct DiskRadixSorter {
    /// Key codec.
    codec: DigitCodec,
    /// Directory to be used to store bucket files. If [`None`] the output file directory is used.
    work_dir: Option<PathBuf>,
    /// Bucket file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl DiskRadixSorter {
    /// Creates a new on-disk radix sorter instance.
    ///
    /// # Arguments
    /// * `key_width` - Number of decimal digits per key. If the parameter is [`None`] six digit keys are assumed.
    /// * `work_dir` - Directory to be used to store bucket files. If the parameter is [`None`] the directory
    ///   of the output file is used.
    /// * `rw_buf_size` - Bucket files read/write buffer size.
    pub fn new(key_width: Option<usize>, work_dir: Option<&Path>, rw_buf_size: Option<usize>) -> Result<Self, SortError> {
        let width = match key_width {
            Some(key_width) => KeyWidth::new(key_width).map_err(|err| SortError::Config(err.to_string()))?,
            None => KeyWidth::DEFAULT,
        };

        if rw_buf_size == Some(0) {
            return Err(SortError::Config("read/write buffer size must be positive".to_owned()));
        }

        return Ok(DiskRadixSorter {
            codec: DigitCodec::new(width),
            work_dir: work_dir.map(Path::to_path_buf),
            rw_buf_size,
        });
    }

    /// Number of decimal digits per key, which is also the number of passes.
    pub fn key_width(&self) -> usize {
        self.codec.width()
    }

    fn resolve_work_dir(&self, output: &Path) -> PathBuf {
        if let Some(work_dir) = &self.work_dir {
            return work_dir.clone();
        }

        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Rejects an input named like any bucket file of the run, since the passes would truncate and retire it,
    /// and an output named like a terminal bucket file, since concatenation would read it while appending to it.
    fn check_clashes(&self, work_dir: &Path, input: &Path, output: &Path) -> Result<(), SortError> {
        let work_dir = fs::canonicalize(work_dir).unwrap_or_else(|_| work_dir.to_path_buf());
        let terminal_pass = self.key_width() - 1;

        let input_aliases = path_aliases(input);
        let input_clash = (0..=terminal_pass)
            .flat_map(|pass_index| bucket_paths(&work_dir, pass_index))
            .any(|bucket| input_aliases.contains(&bucket));
        if input_clash {
            return Err(SortError::Config(format!(
                "input file {} clashes with intermediate file names",
                input.display()
            )));
        }

        let output_aliases = path_aliases(output);
        let output_clash = bucket_paths(&work_dir, terminal_pass)
            .into_iter()
            .any(|bucket| output_aliases.contains(&bucket));
        if output_clash {
            return Err(SortError::Config(format!(
                "output file {} clashes with intermediate file names",
                output.display()
            )));
        }

        return Ok(());
    }

    /// Sorts keys of the input file into the output file.
    /// Returns the run report including the number of records sorted.
    ///
    /// # Arguments
    /// * `input` - File to be sorted, it is never modified
    /// * `output` - Resulting file, overwritten if exists
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortReport, SortError> {
        let ctx = PassContext {
            codec: self.codec,
            work_dir: self.resolve_work_dir(output),
            rw_buf_size: self.rw_buf_size,
        };

        self.check_clashes(&ctx.work_dir, input, output)?;

        log::info!(
            "sorting {} into {} ({}-digit keys, work dir: {})",
            input.display(),
            output.display(),
            self.key_width(),
            ctx.work_dir.display()
        );

        let mut generation = Generation::initial(input);
        let mut records = 0;

        for pass_index in 0..self.key_width() {
            let outcome = run_pass(&ctx, pass_index, generation)?;

            if pass_index == 0 {
                records = outcome.records;
            } else if outcome.records != records {
                return Err(SortError::Internal(format!(
                    "pass {} routed {} records, {} expected",
                    pass_index, outcome.records, records
                )));
            }

            generation = outcome.generation;
        }

        let report = concatenate(generation, output, self.rw_buf_size)?;
        if !report.failed.is_empty() {
            log::warn!("{} bucket(s) missing from {}", report.failed.len(), output.display());
        }

        log::info!("sorted {} lines into {}", records, output.display());

        return Ok(SortReport {
            records,
            skipped_buckets: Vec::from_iter(report.failed.into_iter().map(|(path, _)| path)),
        });
    }
}

/// Returns the spellings a file may be reached by: the path with its directory canonicalized and,
/// if the file exists, its fully canonical path (symlinks resolved).
fn path_aliases(path: &Path) -> Vec<PathBuf> {
    let mut aliases = Vec::with_capacity(2);

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(parent), Some(name)) => aliases.push(parent.join(name)),
        _ => aliases.push(path.to_path_buf()),
    }

    if let Ok(canonical) = fs::canonicalize(path) {
        aliases.push(canonical);
    }

    return aliases;
}

/// Sorts six digit keys of the input file into the output file on disk using default settings.
/// Returns the number of records sorted.
pub fn sort_on_disk(input: &Path, output: &Path) -> Result<u64, SortError> {
    let sorter = DiskRadixSorterBuilder::new().build()?;

    return Ok(sorter.sort(input, output)?.records);
}
