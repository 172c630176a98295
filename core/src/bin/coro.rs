/// Coro CLI
///
/// Runs and checks session files against the engine without any embedding
/// host. Useful for trying out computations and driver scripts.

use coro_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
