//! Fallback for platforms without a foreground window query.

pub const SUPPORTED: bool = false;

pub fn foreground_process_name() -> Option<String> {
    None
}
