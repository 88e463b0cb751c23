//! Output formatting for human-readable and JSON output

mod formatter;

pub use formatter::Formatter;

/// Output settings from the global flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Strict JSON on stdout, no colors or progress
    pub json: bool,
    pub no_color: bool,
    /// Only errors are printed
    pub quiet: bool,
}
