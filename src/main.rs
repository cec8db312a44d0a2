use clap::Parser;
use spotsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
