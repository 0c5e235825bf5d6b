//! Build version with embedded git metadata.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `{version}+{branch}.{sha}[.dirty]`, with "unknown" for git fields when
/// built outside a checkout.
pub fn version_string() -> String {
    let branch = option_env!("VERGEN_GIT_BRANCH").unwrap_or("unknown");
    let sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown");
    let short_sha = sha.get(..7).unwrap_or(sha);
    let dirty = match option_env!("VERGEN_GIT_DIRTY") {
        Some("true") => ".dirty",
        _ => "",
    };
    format!("{PKG_VERSION}+{branch}.{short_sha}{dirty}")
}
