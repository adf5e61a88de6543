//! Entry point for the `stopsync` binary.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = stopsync_cli::run() {
        eprintln!("stopsync: {err}");
        std::process::exit(err.exit_code());
    }
}
