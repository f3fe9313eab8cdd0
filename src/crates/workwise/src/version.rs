//! Version information injected at compile time by `build.rs`.

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build number (from CI or default to 0)
pub const BUILD_NUMBER: &str = env!("BUILD_NUMBER");

/// Git commit hash (short form)
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");

/// Build timestamp (RFC3339 format)
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");

/// e.g. `workwise v0.1.0 (build 42, commit abc123, built 2025-01-15T10:30:00Z)`
pub fn full_version() -> String {
    format!(
        "workwise v{} (build {}, commit {}, built {})",
        VERSION, BUILD_NUMBER, GIT_COMMIT, BUILD_TIMESTAMP
    )
}

pub fn short_version() -> String {
    format!("v{}", VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions() {
        assert_eq!(short_version(), format!("v{}", VERSION));
        let full = full_version();
        assert!(full.starts_with("workwise v"));
        assert!(full.contains(GIT_COMMIT));
    }
}
