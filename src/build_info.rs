/// Build-time git commit SHA stamped by build.rs when available.
pub fn git_sha() -> Option<&'static str> {
    option_env!("TM2BD_BUILD_GIT_SHA")
}

/// Version string shown by `tm2bd --version`: the package version, followed
/// by the commit SHA when the build ran inside a git checkout.
pub const LONG_VERSION: &str = env!("TM2BD_LONG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_version_starts_with_package_version() {
        assert!(LONG_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        if let Some(sha) = git_sha() {
            assert!(LONG_VERSION.ends_with(&format!("({sha})")));
        }
    }
}
