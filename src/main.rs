//! `aimo` CLI binary.
//!
//! This is the minimal entrypoint; all logic is in the library. `main.rs`
//! only invokes `cli::run()` and maps its `Result<(), ExitCode>` to a
//! process exit code.

fn main() {
    if let Err(code) = aimo_engine::cli::run() {
        std::process::exit(code.as_i32());
    }
}
