// Tool name and version baked in at build time

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "cmonitor-report 0.8.0": the "Report generated by" summary value.
pub fn generated_by() -> String {
    format!("{NAME} {VERSION}")
}
