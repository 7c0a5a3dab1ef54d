use clap::Parser;
use quantsim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
