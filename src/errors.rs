use thiserror::Error;

/// Error taxonomy for the footprint pipeline.
///
/// Empty results are not errors: an address that resolves but has no nearby
/// building propagates as `Ok(None)` through the pipeline, never as a variant
/// of this enum.
#[derive(Debug, Error)]
pub enum FootprintError {
    /// The address could not be resolved to coordinates.
    #[error("could not geocode address: {0}")]
    GeocodeNotFound(String),

    /// A remote service could not be reached or its response could not be
    /// parsed. Never retried automatically; retry policy is a caller concern.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Coordinate reprojection was undefined or failed for a frame pair.
    /// Fatal to the query in progress.
    #[error("projection from {from} to {to} failed: {detail}")]
    Projection {
        from: String,
        to: String,
        detail: String,
    },
}
