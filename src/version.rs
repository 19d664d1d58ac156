// Version information for the TrOCR service

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("TrOCR Service {}", VERSION_NUMBER)
}
