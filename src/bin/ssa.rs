//! SSA driver: JSON program in, SSA-form (or round-tripped) JSON program out.

use clap::Parser;

use il_midend::cli::{exit_with_error, init_tracing, SsaCli};

fn main() {
    let cli = SsaCli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = cli.run() {
        exit_with_error(&err);
    }
}
