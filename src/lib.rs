//! `radix-sort` is a rust on-disk decimal radix sort implementation.
//!
//! It sorts text files of fixed-width, non-negative decimal keys stored one per line. The data set is never
//! loaded into memory: every pass re-partitions the whole data set into ten digit-indexed bucket files on disk,
//! going from the least significant digit to the most significant one, and the buckets of the last pass are
//! concatenated into the output. For more information see [Radix sort](https://en.wikipedia.org/wiki/Radix_sort).
//!
//! # Overview
//!
//! `radix-sort` supports the following features:
//!
//! * **Bounded resources:**
//!   memory consumption does not depend on the data set size and at most ten bucket files are written at once.
//! * **Configurable key width:**
//!   keys of 1 to 19 decimal digits are supported, shorter keys are zero-padded.
//! * **In-memory engine:**
//!   the same sort performed in memory for data sets that fit into RAM.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use radix_sort::DiskRadixSorterBuilder;
//!
//! fn main() {
//!     let sorter = DiskRadixSorterBuilder::new()
//!         .with_key_width(6)
//!         .with_rw_buf_size(64 * 1024)
//!         .build()
//!         .unwrap();
//!
//!     let report = sorter.sort(Path::new("input.txt"), Path::new("output.txt")).unwrap();
//!     println!("sorted {} records", report.records);
//! }
//! ```

pub mod bucket;
pub mod concat;
pub mod digit;
pub mod memory;
pub mod pass;
pub mod sort;
pub mod timer;

pub use bucket::{bucket_paths, BucketWriters, BUCKETS};
pub use concat::{concatenate, ConcatReport};
pub use digit::{CodecError, DigitCodec, KeyWidth};
pub use memory::{radix_sort, sort_in_memory};
pub use pass::{run_pass, Generation, PassContext, PassOutcome};
pub use sort::{sort_on_disk, DiskRadixSorter, DiskRadixSorterBuilder, SortError, SortReport};
pub use timer::{measure, CountingAllocator, Measurement};
