//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use std::io::{self, BufWriter};
use std::process::ExitCode;

use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tikv_jemallocator::Jemalloc;

use pzip::tools::cli::{pzopts_init, Mode, USAGE};
use pzip::{compress, decompress};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const OUT_BUFFER: usize = 1 << 16;

fn main() -> ExitCode {
    // Available log levels are Error, Warn, Info, Debug, Trace. The options narrow this down.
    // Logs go to stderr because stdout carries the compressed stream.
    if TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("pzip: logger already initialized");
    }

    let options = match pzopts_init() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("pzip: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if options.files.is_empty() {
        println!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    //----- Figure out what we need to do and go do it
    let mut out = BufWriter::with_capacity(OUT_BUFFER, io::stdout());
    let result = match options.op_mode {
        Mode::Zip => compress(&options, &mut out).map(|stats| stats.bytes_out),
        Mode::Unzip => decompress(&options, &mut out),
    };

    match result {
        Ok(bytes) => {
            info!("Done. {} bytes written.", bytes);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("pzip: {} failed: {}", options.op_mode, e);
            ExitCode::FAILURE
        }
    }
}
