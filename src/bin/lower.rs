//! Lowering driver: JSON program in, LLVM assembly module out.

use clap::Parser;

use il_midend::cli::{exit_with_error, init_tracing, LowerCli};

fn main() {
    let cli = LowerCli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = cli.run() {
        exit_with_error(&err);
    }
}
