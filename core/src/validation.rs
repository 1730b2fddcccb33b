use std::sync::LazyLock;

use regex::Regex;

use crate::error::GuardianError;

pub const INVALID_IP_MESSAGE: &str = "Invalid IP address format";
pub const TAG_NAME_REQUIRED_MESSAGE: &str = "Tag name is required";
pub const LIMIT_TOO_LARGE_MESSAGE: &str = "Limit cannot exceed 10,000";
pub const PAGINATION_BOUNDS_MESSAGE: &str =
    "Offset must be non-negative and limit must be positive";

pub const DEFAULT_OFFSET: u64 = 0;
pub const DEFAULT_LIMIT: u64 = 1000;
pub const MAX_LIMIT: u64 = 10_000;

// Octets 0-255, no leading zeros.
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])$")
        .expect("IPv4 pattern must compile")
});

// Full eight-group form only. Compressed forms other than `::` and `::1` are rejected.
static IPV6_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$")
        .expect("IPv6 pattern must compile")
});

pub fn is_valid_ip(candidate: &str) -> bool {
    matches!(candidate, "::" | "::1") || IPV4.is_match(candidate) || IPV6_FULL.is_match(candidate)
}

pub fn validate_ip(candidate: &str) -> Result<(), GuardianError> {
    if is_valid_ip(candidate) {
        Ok(())
    } else {
        Err(GuardianError::invalid_input(INVALID_IP_MESSAGE))
    }
}

pub fn validate_tag_name(tag_name: &str) -> Result<(), GuardianError> {
    if tag_name.trim().is_empty() {
        return Err(GuardianError::invalid_input(TAG_NAME_REQUIRED_MESSAGE));
    }
    Ok(())
}

/// Pagination request for the tag-address listing.
///
/// Values arrive loosely typed, so they are held as `f64` until validated.
/// Fractions are accepted and truncated toward zero by [`Pagination::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub offset: f64,
    pub limit: f64,
    pub snapshot: Option<String>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET as f64,
            limit: DEFAULT_LIMIT as f64,
            snapshot: None,
        }
    }
}

/// Validated, integral pagination ready to be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
    pub snapshot: Option<String>,
}

impl Pagination {
    pub fn new(offset: f64, limit: f64) -> Self {
        Self {
            offset,
            limit,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: impl Into<String>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    /// The limit ceiling is checked first so an oversized page gets its own message.
    pub fn validate(&self) -> Result<PageWindow, GuardianError> {
        if self.limit > MAX_LIMIT as f64 {
            return Err(GuardianError::invalid_input(LIMIT_TOO_LARGE_MESSAGE));
        }
        if !self.offset.is_finite() || !self.limit.is_finite() || self.offset < 0.0 || self.limit < 1.0
        {
            return Err(GuardianError::invalid_input(PAGINATION_BOUNDS_MESSAGE));
        }
        Ok(PageWindow {
            offset: self.offset.trunc() as u64,
            limit: self.limit.trunc() as u64,
            snapshot: self.snapshot.clone().filter(|s| !s.is_empty()),
        })
    }
}
