use clap::Parser;
use log::LevelFilter;
use std::env;
use std::process;
use tacopkm::cli::{self, ConsoleUi};
use tacopkm::Opt;

fn main() {
    // DEBUG turns on debug-level logging and error details
    let debug = env::var("DEBUG").map(|v| !v.is_empty()).unwrap_or(false);
    env_logger::builder()
        .filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let opt = Opt::parse();
    let mut ui = ConsoleUi;
    if let Err(e) = cli::run(opt.command, &mut ui) {
        eprintln!("Error: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {hint}");
        }
        if debug {
            eprintln!("Details: {e:?}");
        }
        process::exit(1);
    }
}
