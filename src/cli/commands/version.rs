//! `version` command handler.

/// Prints version information.
pub fn run() {
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}
