use std::fs;
use std::path;

use env_logger;
use log;

use radix_sort::{DiskRadixSorter, DiskRadixSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    fs::write("input.txt", "503210\n000001\n503100\n999999\n000000\n").unwrap();

    let sorter: DiskRadixSorter = DiskRadixSorterBuilder::new()
        .with_key_width(6)
        .with_work_dir(path::Path::new("./"))
        .build()
        .unwrap();

    let report = sorter
        .sort(path::Path::new("input.txt"), path::Path::new("output.txt"))
        .unwrap();

    print!("{}", fs::read_to_string("output.txt").unwrap());
    println!("{} records sorted", report.records);
}
