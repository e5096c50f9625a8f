//! Version command.

use tpix_pm::Platform;

pub fn version_line() -> String {
    let platform = Platform::current();
    format!(
        "tpix {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        platform.os(),
        platform.arch()
    )
}

pub fn print_version() {
    println!("{}", version_line());
}
