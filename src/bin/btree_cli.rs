//! Table command language REPL.
//!
//! Usage:
//!   bplus_table_cli [script_file]
//!
//! Reads commands from `script_file`, or stdin if no argument is given, one
//! per line, and writes results to stdout. Tables are stored as
//! `<name>.tree` files under a `data` directory next to the binary's working
//! directory; `RUST_LOG` controls log verbosity.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::exit;

use bplus_table_store::command::{self, Registry};
use bplus_table_store::DEFAULT_CACHE_CAPACITY;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let reader: Box<dyn BufRead> = match args.get(1) {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("could not open {path}: {e}");
                exit(1);
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut registry = Registry::new(data_dir(), DEFAULT_CACHE_CAPACITY);
    let stdout = io::stdout();
    let result = command::run(reader, stdout.lock(), &mut registry);

    if let Err(e) = registry.close_all() {
        eprintln!("error closing tables: {e}");
        exit(1);
    }

    if let Err(e) = result {
        eprintln!("error: {e}");
        exit(1);
    }
}

fn data_dir() -> std::path::PathBuf {
    let dir = std::path::PathBuf::from("data");
    std::fs::create_dir_all(&dir).ok();
    dir
}
