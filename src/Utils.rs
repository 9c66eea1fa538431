/// case directory layout, field files and time directories
pub mod field_io;
/// terminal and file logger set-up
pub mod logging;
/// per-step summary table
pub mod diagnostics;
