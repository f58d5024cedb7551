//! System Memory Probe
//!
//! Queries the host for its total physical memory.

use crate::error::{CacheError, Result};

/// Returns the host's total physical memory in bytes.
///
/// Nothing is cached; every call queries the platform again.
///
/// # Errors
/// Returns `ProbeUnavailable` if the platform query fails or the platform is
/// not supported.
pub fn total_system_memory() -> Result<u64> {
    platform_total_memory()
}

#[cfg(target_os = "linux")]
fn platform_total_memory() -> Result<u64> {
    let contents = std::fs::read_to_string("/proc/meminfo")
        .map_err(|e| CacheError::ProbeUnavailable(format!("/proc/meminfo: {}", e)))?;
    parse_meminfo(&contents)
}

#[cfg(target_os = "macos")]
fn platform_total_memory() -> Result<u64> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "hw.memsize"])
        .output()
        .map_err(|e| CacheError::ProbeUnavailable(format!("sysctl: {}", e)))?;

    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .map_err(|_| CacheError::ProbeUnavailable("sysctl hw.memsize returned no value".into()))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_total_memory() -> Result<u64> {
    Err(CacheError::ProbeUnavailable(format!(
        "unsupported platform: {}",
        std::env::consts::OS
    )))
}

/// Extracts `MemTotal` (reported in kB) from `/proc/meminfo` contents.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(contents: &str) -> Result<u64> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
        .ok_or_else(|| CacheError::ProbeUnavailable("MemTotal missing from /proc/meminfo".into()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let contents = "MemTotal:       16318412 kB\nMemFree:         1234567 kB\n";
        assert_eq!(parse_meminfo(contents).unwrap(), 16_318_412 * 1024);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        let result = parse_meminfo("MemFree:         1234567 kB\n");
        assert!(matches!(result, Err(CacheError::ProbeUnavailable(_))));
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_total_system_memory_nonzero() {
        let total = total_system_memory().unwrap();
        assert!(total > 0);
    }
}
