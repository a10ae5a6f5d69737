//! keydex CLI entry point.

use clap::Parser;
use keydex::cli::{run_app, Cli};
use keydex::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run_app(cli) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
