//! Unified error handling for matching, clustering and catalog loading.
//!
//! Every fallible operation in the crate returns [`Result`], so callers can
//! tell "the request failed" apart from "nothing matched" (an empty `Ok`).

use thiserror::Error;

/// Errors produced by the matching and zoning engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalMatchError {
    /// The route was empty or contained unusable points.
    #[error("invalid route: {reason}")]
    InvalidRoute { reason: String },

    /// A radius, threshold or similar tuning value was out of range.
    #[error("invalid parameter '{name}': {value} (must be a positive, finite number)")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The signal catalog could not be read or held no usable records.
    #[error("signal catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    /// A zone index outside `1..=zone_count` was requested.
    #[error("zone {index} not found ({zone_count} zones available)")]
    NotFound { index: u32, zone_count: usize },

    /// A bounded operation ran past its deadline.
    #[error("operation timed out after {elapsed_ms}ms (deadline {deadline_ms}ms)")]
    Timeout { elapsed_ms: u64, deadline_ms: u64 },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl SignalMatchError {
    pub fn invalid_route(reason: impl Into<String>) -> Self {
        Self::InvalidRoute {
            reason: reason.into(),
        }
    }

    pub fn catalog_unavailable(reason: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            reason: reason.into(),
        }
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, SignalMatchError>;

/// Conversions from `Option` into the crate's error variants.
pub trait OptionExt<T> {
    /// Map `None` to [`SignalMatchError::NotFound`].
    fn ok_or_not_found(self, index: u32, zone_count: usize) -> Result<T>;

    /// Map `None` to [`SignalMatchError::CatalogUnavailable`].
    fn ok_or_catalog_unavailable(self, reason: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, index: u32, zone_count: usize) -> Result<T> {
        self.ok_or(SignalMatchError::NotFound { index, zone_count })
    }

    fn ok_or_catalog_unavailable(self, reason: &str) -> Result<T> {
        self.ok_or_else(|| SignalMatchError::catalog_unavailable(reason))
    }
}

/// Reject non-positive or non-finite tuning values.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SignalMatchError::InvalidParameter { name, value })
    }
}
