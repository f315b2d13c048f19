//! Device position acquisition.
//!
//! A submission asks for the position exactly once. Any failure aborts the
//! submission; there is no retry.

use crate::error::{Capability, Error, Result};
use crate::report::Location;

/// Source of the device's current coordinates.
#[async_trait::async_trait]
pub trait Geolocator: Send + Sync {
    /// Resolve the current position.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityUnavailable`] if the platform cannot locate at all
    /// - [`Error::PermissionDenied`] if the platform refused
    /// - [`Error::LocationTimeout`] if no fix arrived in time
    async fn current_position(&self) -> Result<Location>;
}

/// Geolocator answering with a known position, if it has one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedGeolocator {
    position: Option<Location>,
}

impl FixedGeolocator {
    /// A geolocator that always reports `position`.
    #[must_use]
    pub fn at(position: Location) -> Self {
        Self {
            position: Some(position),
        }
    }

    /// A geolocator with no position source.
    #[must_use]
    pub fn unsupported() -> Self {
        Self { position: None }
    }

    /// Build from an optional position.
    #[must_use]
    pub fn from_option(position: Option<Location>) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Location> {
        let position = self.position.ok_or_else(|| {
            Error::unavailable(Capability::Geolocation, "no position source configured")
        })?;

        if !position.is_valid() {
            return Err(Error::unavailable(
                Capability::Geolocation,
                format!(
                    "position out of range: {}, {}",
                    position.latitude, position.longitude
                ),
            ));
        }
        Ok(position)
    }
}
