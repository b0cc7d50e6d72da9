//! Platform flavor names used by the manifest `os` key.

/// Every flavor a manifest may name.
pub const KNOWN_FLAVORS: &[&str] = &[
    "android", "cygwin", "freebsd", "linux", "mac", "openbsd", "win",
];

/// Flavor of the platform this binary was built for.
pub const fn current_flavor() -> &'static str {
    if cfg!(target_os = "windows") {
        "win"
    } else if cfg!(target_os = "macos") {
        "mac"
    } else if cfg!(target_os = "android") {
        "android"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else if cfg!(target_os = "openbsd") {
        "openbsd"
    } else {
        "linux"
    }
}

/// Whether `value` is one of [`KNOWN_FLAVORS`].
pub fn is_known_flavor(value: &str) -> bool {
    KNOWN_FLAVORS.contains(&value)
}
