use super::{LocationCache, LocationError, LocationOptions, LocationProvider, PositionSample};
use std::sync::Arc;
use std::time::Instant;

/// How the map got (or failed to get) its first anchor
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorResolution {
    /// A fix from the provider
    Fresh(PositionSample),
    /// The provider failed twice; the last known fix is still valid
    Cached(PositionSample),
    /// The user refused location access; no spawns this session
    PermissionRequired,
    /// Location services are off; the cached fix is offered as a fallback
    ServicesDisabled { fallback: Option<PositionSample> },
    Unavailable(LocationError),
}

impl AnchorResolution {
    /// Position usable as an anchor, if any
    pub fn anchor(&self) -> Option<PositionSample> {
        match self {
            Self::Fresh(sample) | Self::Cached(sample) => Some(*sample),
            Self::ServicesDisabled { fallback } => *fallback,
            Self::PermissionRequired | Self::Unavailable(_) => None,
        }
    }
}

/// Acquires the first anchor with one relaxed retry and a cached fallback
#[derive(Clone)]
pub struct AnchorResolver {
    provider: Arc<dyn LocationProvider>,
    options: LocationOptions,
    cache: Arc<LocationCache>,
}

impl AnchorResolver {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        options: LocationOptions,
        cache: Arc<LocationCache>,
    ) -> Self {
        Self {
            provider,
            options,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    pub async fn resolve(&self, now: Instant) -> AnchorResolution {
        let first = match self.provider.current_position(&self.options).await {
            Ok(sample) => return self.fresh(sample),
            Err(e) => e,
        };
        if let Some(terminal) = self.terminal(&first, now) {
            return terminal;
        }
        // Only a timeout earns the relaxed retry.
        if first != LocationError::Timeout {
            return self.fallback(first, now);
        }

        log::warn!("Location fix timed out, retrying with relaxed accuracy");
        let second = match self.provider.current_position(&self.options.relaxed()).await {
            Ok(sample) => return self.fresh(sample),
            Err(e) => e,
        };
        if let Some(terminal) = self.terminal(&second, now) {
            return terminal;
        }
        self.fallback(second, now)
    }

    fn fallback(&self, error: LocationError, now: Instant) -> AnchorResolution {
        match self.cache.fresh(now) {
            Some(cached) => {
                log::warn!("Location fix failed ({error}), using last known position");
                AnchorResolution::Cached(cached)
            }
            None => {
                log::warn!("Location fix failed ({error}), no usable cached position");
                AnchorResolution::Unavailable(error)
            }
        }
    }

    fn fresh(&self, sample: PositionSample) -> AnchorResolution {
        self.cache.record(sample);
        AnchorResolution::Fresh(sample)
    }

    fn terminal(&self, error: &LocationError, now: Instant) -> Option<AnchorResolution> {
        match error {
            LocationError::PermissionDenied => {
                log::warn!("Location permission denied");
                Some(AnchorResolution::PermissionRequired)
            }
            LocationError::ServiceDisabled => {
                log::warn!("Location services disabled");
                Some(AnchorResolution::ServicesDisabled {
                    fallback: self.cache.fresh(now),
                })
            }
            LocationError::Timeout | LocationError::Unavailable(_) => None,
        }
    }
}

impl std::fmt::Debug for AnchorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorResolver")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
