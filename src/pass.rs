//! Pass executor.

use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;

use crate::bucket::{bucket_paths, BucketWriters};
use crate::digit::{CodecError, DigitCodec};
use crate::sort::SortError;

/// Ordered list of files holding the data set between two passes.
///
/// Generation `0` is the user supplied input file, every following generation consists of the ten bucket
/// files of the pass that produced it. A generation is moved into the pass consuming it.
#[derive(Debug, PartialEq, Eq)]
pub struct Generation {
    index: usize,
    files: Vec<PathBuf>,
}

impl Generation {
    /// Creates the initial generation consisting of the input file only.
    pub fn initial(input: &Path) -> Self {
        Generation {
            index: 0,
            files: vec![input.to_path_buf()],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Whether the files are intermediate ones and must be deleted once consumed.
    /// The input file (generation `0`) is never deleted.
    pub fn is_retirable(&self) -> bool {
        self.index > 0
    }

    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }
}

/// Parameters shared by every pass of a sort run.
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Key codec.
    pub codec: DigitCodec,
    /// Directory bucket files are created in.
    pub work_dir: PathBuf,
    /// File read/write buffer size.
    pub rw_buf_size: Option<usize>,
}

impl PassContext {
    /// Digit position the pass routes on. Passes go from the least significant digit to the most significant one,
    /// so the last pass, whose buckets are concatenated, dominates the resulting order.
    /// Returns [`None`] if the pass index is outside of the key width.
    pub fn digit_position(&self, pass_index: usize) -> Option<usize> {
        (self.codec.width() - 1).checked_sub(pass_index)
    }
}

/// Result of a single pass.
#[derive(Debug)]
pub struct PassOutcome {
    /// Generation produced by the pass.
    pub generation: Generation,
    /// Number of records routed during the pass.
    pub records: u64,
}

/// Runs a single pass: routes every record of the input generation to the bucket of its digit.
///
/// Input files are processed in the given order and records are appended in the order they are read,
/// so the partition is stable. Intermediate input files are deleted right after they are consumed.
///
/// # Arguments
/// * `ctx` - Pass parameters
/// * `pass_index` - Index of the pass, `0..width`
/// * `input` - Generation to be consumed
pub fn run_pass(ctx: &PassContext, pass_index: usize, input: Generation) -> Result<PassOutcome, SortError> {
    let position = ctx.digit_position(pass_index).ok_or_else(|| {
        SortError::Internal(format!("pass {} exceeds key width {}", pass_index, ctx.codec.width()))
    })?;
    log::info!(
        "pass {} started (digit position: {}, input files: {})",
        pass_index,
        position,
        input.files().len()
    );

    let mut buckets = BucketWriters::open(bucket_paths(&ctx.work_dir, pass_index), ctx.rw_buf_size)?;

    let retire = input.is_retirable();
    let mut records = 0;
    let mut encoded = String::with_capacity(ctx.codec.width());

    for path in input.into_files() {
        records += route_file(ctx, position, &path, &mut buckets, &mut encoded)?;

        if retire {
            fs::remove_file(&path).map_err(|err| SortError::Resource {
                path: path.clone(),
                source: err,
            })?;
            log::debug!("{} retired", path.display());
        }
    }

    let files = buckets.close()?;
    log::info!("pass {} done (records: {})", pass_index, records);

    return Ok(PassOutcome {
        generation: Generation {
            index: pass_index + 1,
            files,
        },
        records,
    });
}

fn route_file(
    ctx: &PassContext,
    position: usize,
    path: &Path,
    buckets: &mut BucketWriters,
    encoded: &mut String,
) -> Result<u64, SortError> {
    let file = fs::File::open(path).map_err(|err| SortError::Input {
        path: path.to_path_buf(),
        source: err,
    })?;
    let reader = match ctx.rw_buf_size {
        Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
        None => io::BufReader::new(file),
    };

    let mut records = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| SortError::Input {
            path: path.to_path_buf(),
            source: err,
        })?;

        let decode_error = |err: CodecError| SortError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source: err,
        };
        let key = ctx.codec.decode(&line).map_err(decode_error)?;
        ctx.codec.encode_into(key, encoded).map_err(decode_error)?;
        let digit = ctx.codec.digit_of(encoded, position).map_err(decode_error)?;

        buckets.write_record(digit as usize, encoded)?;
        records += 1;
    }

    return Ok(records);
}
