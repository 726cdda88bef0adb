//! Execution time and memory allocation measurement.
//!
//! Memory counters are maintained by [`CountingAllocator`], which has to be installed as the global allocator
//! by the binary. Without it allocation figures are reported as zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global allocator wrapper counting allocated bytes.
pub struct CountingAllocator {
    /// Bytes currently allocated.
    live: AtomicU64,
    /// Bytes allocated since the start, deallocations are not subtracted.
    total: AtomicU64,
}

impl CountingAllocator {
    pub const fn new() -> Self {
        CountingAllocator {
            live: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Returns a snapshot of the allocation counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            live: self.live.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    fn on_alloc(&self, size: usize) {
        self.live.fetch_add(size as u64, Ordering::Relaxed);
        self.total.fetch_add(size as u64, Ordering::Relaxed);
    }

    fn on_dealloc(&self, size: usize) {
        self.live.fetch_sub(size as u64, Ordering::Relaxed);
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            self.on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.on_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        self.on_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            self.on_dealloc(layout.size());
            self.on_alloc(new_size);
        }
        new_ptr
    }
}

/// Allocation counters snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes currently allocated.
    pub live: u64,
    /// Bytes allocated since the start.
    pub total: u64,
}

/// Measurement of a single call.
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    /// Wall clock execution time.
    pub elapsed: Duration,
    /// Growth of allocated memory during the call.
    pub allocated_bytes: u64,
    /// Memory allocated since the program start.
    pub total_allocated_bytes: u64,
}

/// Calls the function measuring its execution time and memory allocations.
///
/// # Arguments
/// * `allocator` - Allocator to sample counters from, [`None`] if no counting allocator is installed
/// * `f` - Function to be measured
pub fn measure<F, R>(allocator: Option<&CountingAllocator>, f: F) -> (R, Measurement)
where
    F: FnOnce() -> R,
{
    let sample = || allocator.map(CountingAllocator::stats).unwrap_or_default();

    let start = Instant::now();
    let before = sample();

    let result = f();

    let after = sample();
    let elapsed = start.elapsed();

    let measurement = Measurement {
        elapsed,
        allocated_bytes: after.live.saturating_sub(before.live),
        total_allocated_bytes: after.total,
    };

    return (result, measurement);
}
