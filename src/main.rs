use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use radix_sort::{measure, sort_in_memory, CountingAllocator, DiskRadixSorter, DiskRadixSorterBuilder, KeyWidth};

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator::new();

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let algorithm: Algorithm = arg_parser.value_of_t_or_exit("algorithm");
    let key_width: usize = arg_parser.value_of_t_or_exit("width");
    let work_dir: Option<&str> = arg_parser.value_of("work_dir");
    let rw_buf_size: Option<u64> = arg_parser
        .value_of("rw_buf_size")
        .map(|v| v.parse::<ByteSize>().expect("value is pre-validated").as_u64());

    let input = path::Path::new(arg_parser.value_of("input").expect("value is required"));
    let output = path::Path::new(arg_parser.value_of("output").expect("value is required"));

    let (result, measurement) = match algorithm {
        Algorithm::Rim => {
            let width = match KeyWidth::new(key_width) {
                Ok(width) => width,
                Err(err) => {
                    log::error!("sorter initialization error: {}", err);
                    process::exit(1);
                }
            };
            measure(Some(&ALLOCATOR), || sort_in_memory(input, output, width))
        }
        Algorithm::Rod => {
            let mut sorter_builder = DiskRadixSorterBuilder::new().with_key_width(key_width);
            if let Some(work_dir) = work_dir {
                sorter_builder = sorter_builder.with_work_dir(path::Path::new(work_dir));
            }
            if let Some(rw_buf_size) = rw_buf_size {
                sorter_builder = sorter_builder.with_rw_buf_size(rw_buf_size as usize);
            }

            let sorter: DiskRadixSorter = match sorter_builder.build() {
                Ok(sorter) => sorter,
                Err(err) => {
                    log::error!("sorter initialization error: {}", err);
                    process::exit(1);
                }
            };
            measure(Some(&ALLOCATOR), || sorter.sort(input, output).map(|report| report.records))
        }
    };

    let records = match result {
        Ok(records) => records,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    println!("Sorted {} lines into {}", records, output.display());
    println!("Execution time: {:?}", measurement.elapsed);
    println!(
        "Allocated memory during execution: {}",
        ByteSize::b(measurement.allocated_bytes)
    );
    println!(
        "Total memory allocated since start: {}",
        ByteSize::b(measurement.total_allocated_bytes)
    );
}

/// Logging verbosity.
#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

/// Sort engine.
#[derive(Copy, Clone, clap::ArgEnum)]
enum Algorithm {
    Rim,
    Rod,
}

impl Algorithm {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Algorithm::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Algorithm as clap::ArgEnum>::from_str(s, true)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("radix-sort")
        .about("decimal radix sorter")
        .arg(
            clap::Arg::new("algorithm")
                .help("sort engine: rim (in memory) or rod (on disk)")
                .required(true)
                .takes_value(true)
                .ignore_case(true)
                .possible_values(Algorithm::possible_values()),
        )
        .arg(
            clap::Arg::new("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("width")
                .short('w')
                .long("width")
                .help("number of decimal digits per key")
                .takes_value(true)
                .default_value("6")
                .validator(|v| match v.parse::<usize>().map(KeyWidth::new) {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(err) => Err(format!("Key width format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("work_dir")
                .short('d')
                .long("work-dir")
                .help("directory to be used to store intermediate bucket files (default: output file directory)")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("bucket files read/write buffer size")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(size) if size.as_u64() > 0 => Ok(()),
                    Ok(_) => Err("Buffer size must be positive".to_owned()),
                    Err(err) => Err(format!("Buffer size format incorrect: {}", err)),
                }),
        )
        .get_matches()
}

/// Installs `env_logger` with the level selected on the command line.
fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
