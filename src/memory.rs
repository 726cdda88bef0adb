//! In-memory radix sort.
//!
//! Loads every key into memory and sorts them with a stable counting sort per decimal digit,
//! least significant digit first.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use log;

use crate::bucket::BUCKETS;
use crate::digit::{DigitCodec, KeyWidth};
use crate::sort::SortError;

/// Sorts keys in ascending order. Every key must fit into the codec width.
pub fn radix_sort(keys: &mut [u64], width: KeyWidth) {
    let n = keys.len();
    if n <= 1 {
        return;
    }

    let mut scratch = vec![0u64; n];
    let mut exp = 1u64;

    for _ in 0..width.get() {
        let mut counts = [0usize; BUCKETS];

        for &key in keys.iter() {
            counts[((key / exp) % 10) as usize] += 1;
        }

        // prefix sums -> start positions
        let mut sum = 0usize;
        for count in counts.iter_mut() {
            let tmp = *count;
            *count = sum;
            sum += tmp;
        }

        // scatter preserving the relative order of equal digits
        for &key in keys.iter() {
            let digit = ((key / exp) % 10) as usize;
            scratch[counts[digit]] = key;
            counts[digit] += 1;
        }

        keys.copy_from_slice(&scratch);
        exp = exp.saturating_mul(10);
    }
}

/// Sorts keys of the input file into the output file in memory.
/// Returns the number of records sorted.
///
/// # Arguments
/// * `input` - File to be sorted
/// * `output` - Resulting file, overwritten if exists
/// * `width` - Number of decimal digits per key
pub fn sort_in_memory(input: &Path, output: &Path, width: KeyWidth) -> Result<u64, SortError> {
    let codec = DigitCodec::new(width);

    let mut keys = read_keys(input, &codec)?;
    log::info!("{} keys loaded from {}", keys.len(), input.display());

    radix_sort(&mut keys, width);
    log::debug!("keys sorted");

    write_keys(output, &codec, &keys)?;
    log::info!("sorted {} lines into {}", keys.len(), output.display());

    return Ok(keys.len() as u64);
}

fn read_keys(path: &Path, codec: &DigitCodec) -> Result<Vec<u64>, SortError> {
    let input_error = |err: io::Error| SortError::Input {
        path: path.to_path_buf(),
        source: err,
    };
    let reader = io::BufReader::new(fs::File::open(path).map_err(input_error)?);

    let mut keys = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(input_error)?;
        let key = codec.decode(&line).map_err(|err| SortError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source: err,
        })?;
        keys.push(key);
    }

    return Ok(keys);
}

fn write_keys(path: &Path, codec: &DigitCodec, keys: &[u64]) -> Result<(), SortError> {
    let output_error = |err: io::Error| SortError::Resource {
        path: path.to_path_buf(),
        source: err,
    };
    let mut writer = io::BufWriter::new(fs::File::create(path).map_err(output_error)?);

    let mut encoded = String::with_capacity(codec.width());
    for &key in keys {
        codec
            .encode_into(key, &mut encoded)
            .map_err(|err| SortError::Internal(format!("decoded key does not re-encode: {}", err)))?;
        writer.write_all(encoded.as_bytes()).map_err(output_error)?;
        writer.write_all(b"\n").map_err(output_error)?;
    }

    return writer.flush().map_err(output_error);
}

#[cfg(test)]
mod test {
    use std::fs;

    use rand::Rng;
    use rstest::*;

    use super::{radix_sort, sort_in_memory};
    use crate::digit::KeyWidth;
    use crate::sort::{DiskRadixSorterBuilder, SortError};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![5], vec![5])]
    #[case(vec![503210, 1, 503100, 999999, 0], vec![0, 1, 503100, 503210, 999999])]
    #[case(vec![21, 10, 12, 10], vec![10, 10, 12, 21])]
    fn test_radix_sort(#[case] keys: Vec<u64>, #[case] expected: Vec<u64>) {
        let mut keys = keys;
        radix_sort(&mut keys, KeyWidth::DEFAULT);
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_radix_sort_widest_keys() {
        let mut keys = vec![9_999_999_999_999_999_999, 0, 1_000_000_000_000_000_000, 42];
        radix_sort(&mut keys, KeyWidth::new(19).unwrap());
        assert_eq!(keys, vec![0, 42, 1_000_000_000_000_000_000, 9_999_999_999_999_999_999]);
    }

    #[rstest]
    fn test_sort_in_memory(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "503210\n000001\r\n503100\n999999\n000000\n").unwrap();

        let records = sort_in_memory(&input, &output, KeyWidth::DEFAULT).unwrap();

        assert_eq!(records, 5);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "000000\n000001\n503100\n503210\n999999\n"
        );
    }

    #[rstest]
    fn test_engines_agree(tmp_dir: tempfile::TempDir) {
        let mut rng = rand::thread_rng();
        let content: String = (0..1000).map(|_| format!("{:05}\n", rng.gen_range(0..100_000))).collect();

        let input = tmp_dir.path().join("input.txt");
        let memory_output = tmp_dir.path().join("memory.txt");
        let disk_output = tmp_dir.path().join("disk.txt");
        fs::write(&input, content).unwrap();

        let width = KeyWidth::new(5).unwrap();
        sort_in_memory(&input, &memory_output, width).unwrap();
        DiskRadixSorterBuilder::new()
            .with_key_width(5)
            .build()
            .unwrap()
            .sort(&input, &disk_output)
            .unwrap();

        let memory_sorted = fs::read_to_string(&memory_output).unwrap();
        let disk_sorted = fs::read_to_string(&disk_output).unwrap();
        assert_eq!(Vec::from_iter(memory_sorted.lines()), Vec::from_iter(disk_sorted.lines()));
    }

    #[rstest]
    fn test_malformed_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "123456\n-23456\n").unwrap();

        let result = sort_in_memory(&input, &output, KeyWidth::DEFAULT);

        assert!(matches!(result, Err(SortError::Decode { line: 2, .. })));
        assert!(!output.exists());
    }
}
