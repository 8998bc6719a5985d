//! Terminal logging for the `heckle` binary.

use log::LevelFilter;

/// Parse a level name, falling back to `warn`.
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("off") => LevelFilter::Off,
        Some("error") => LevelFilter::Error,
        Some("info") => LevelFilter::Info,
        Some("debug") => LevelFilter::Debug,
        Some("trace") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

/// Route `log` records to stderr so stdout carries only the report.
pub fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
