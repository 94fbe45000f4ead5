use ascii_cloud::cli::{Args, run, setup_logging};
use clap::Parser;
use std::process;

fn main() {
    let args = Args::parse();

    setup_logging(args.verbose, args.quiet);

    match run(&args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
