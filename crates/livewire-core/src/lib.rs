//! livewire-core: gradient cost fields and incremental shortest-path
//! tracing (sans-IO).
//!
//! Snaps a user-drawn boundary onto image edges through:
//! raster -> intensity -> Sobel cost field -> Dijkstra search ->
//! session merge / re-anchor.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! rasters and byte slices and returns structured data. Windowing, pointer
//! wiring and drawing live in the embedding shell (see `livewire-replay`).

pub mod cost;
pub mod diagnostics;
pub mod events;
pub mod intensity;
pub mod search;
pub mod session;
pub mod types;

pub use cost::CostField;
pub use events::{EventQueue, PointerEvent};
pub use intensity::IntensityField;
pub use search::{SearchStats, SearchWorkspace, find_path};
pub use session::{SessionSnapshot, SessionState, TraceSession, UpdateOutcome};
pub use types::{
    Dimensions, Pixel, PixelPath, ReanchorPolicy, RgbImage, TraceConfig, TraceError,
};

/// Build the fields for `raster` and open an idle session over them.
///
/// # Steps
///
/// 1. Validate the configuration
/// 2. Convert the raster to intensity
/// 3. Build the cost field with `config.cost_floor`
/// 4. Hand the cost field to a new [`TraceSession`]
///
/// # Errors
///
/// Returns [`TraceError::InvalidConfig`] for an invalid configuration and
/// [`TraceError::InvalidInput`] for an empty raster.
pub fn open_session(raster: &RgbImage, config: TraceConfig) -> Result<TraceSession, TraceError> {
    config.validate()?;
    let intensity = IntensityField::build(raster)?;
    let cost = CostField::build(&intensity, config.cost_floor)?;
    TraceSession::new(cost, config)
}

/// Decode encoded image bytes and open an idle session over them.
///
/// Returns the decoded raster alongside the session so the caller can
/// draw the trace on top of it.
///
/// # Errors
///
/// Returns [`TraceError::EmptyInput`] if `image_bytes` is empty,
/// [`TraceError::ImageDecode`] if the format is unrecognized, and the
/// errors of [`open_session`].
pub fn open_session_from_bytes(
    image_bytes: &[u8],
    config: TraceConfig,
) -> Result<(RgbImage, TraceSession), TraceError> {
    config.validate()?;
    let (raster, intensity) = intensity::decode(image_bytes)?;
    let cost = CostField::build(&intensity, config.cost_floor)?;
    let session = TraceSession::new(cost, config)?;
    Ok((raster, session))
}
