//! Environment-variable overrides for a small set of option keys.
//!
//! Each variable overrides the same-named option; byte-valued variables
//! accept human-readable sizes (`512K`, `10M`).

use super::Options;
use crate::errors::{Error, Result};
use byte_unit::Byte;
use log::debug;

/// `COPYTREE_MAX_FILE_SIZE`: per-file size cap for discovery.
pub const ENV_MAX_FILE_SIZE: &str = "COPYTREE_MAX_FILE_SIZE";
/// `COPYTREE_MAX_TOTAL_SIZE`: total content byte cap.
pub const ENV_MAX_TOTAL_SIZE: &str = "COPYTREE_MAX_TOTAL_SIZE";
/// `COPYTREE_CHAR_LIMIT`: global character budget.
pub const ENV_CHAR_LIMIT: &str = "COPYTREE_CHAR_LIMIT";
/// `COPYTREE_PROFILE`: default profile name.
pub const ENV_PROFILE: &str = "COPYTREE_PROFILE";

pub(super) fn apply_env_overrides(options: &mut Options) -> Result<()> {
    if let Some(raw) = read(ENV_MAX_FILE_SIZE) {
        options.discovery.max_file_size = Some(parse_bytes(ENV_MAX_FILE_SIZE, &raw)?);
        debug!("{} overrides max file size", ENV_MAX_FILE_SIZE);
    }
    if let Some(raw) = read(ENV_MAX_TOTAL_SIZE) {
        options.limit.max_total_bytes = Some(parse_bytes(ENV_MAX_TOTAL_SIZE, &raw)?);
        debug!("{} overrides max total size", ENV_MAX_TOTAL_SIZE);
    }
    if let Some(raw) = read(ENV_CHAR_LIMIT) {
        let limit: usize = raw
            .parse()
            .map_err(|_| Error::Config(format!("{ENV_CHAR_LIMIT}: '{raw}' is not a number")))?;
        if limit == 0 {
            return Err(Error::Config(format!("{ENV_CHAR_LIMIT} must be positive")));
        }
        options.limit.char_limit = Some(limit);
        debug!("{} overrides char limit", ENV_CHAR_LIMIT);
    }
    if let Some(raw) = read(ENV_PROFILE) {
        options.profile_name = raw;
        debug!("{} overrides profile name", ENV_PROFILE);
    }
    Ok(())
}

fn read(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bytes(key: &str, raw: &str) -> Result<u64> {
    Byte::parse_str(raw, true)
        .map(|b| b.as_u64())
        .map_err(|e| Error::Config(format!("{key}: '{raw}' is not a valid size: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_sizes() {
        assert_eq!(parse_bytes("K", "4096").unwrap(), 4096);
        assert_eq!(parse_bytes("K", "4 KiB").unwrap(), 4096);
        assert_eq!(parse_bytes("K", "1MB").unwrap(), 1_000_000);
        assert!(parse_bytes("K", "lots").is_err());
    }
}
