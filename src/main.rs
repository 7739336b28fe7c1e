//! Minimal entrypoint: all logic lives in the library, `main` only maps
//! the returned `ExitCode` to a process exit status.

fn main() {
    if let Err(code) = readerforge::cli::run() {
        std::process::exit(code.as_i32());
    }
}
