//! Diagnostics: timing, counts and field excerpts.
//!
//! Field construction runs once per raster and every cursor update runs
//! a search, so both are instrumented here for tuning and inspection.
//!
//! Duration measurements use [`std::time::Duration`]. Timestamps come
//! from an injected [`Clock`] so the core stays free of platform timers.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::fmt::Write as _;
use std::time::Duration;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::cost::CostField;
use crate::events::PointerEvent;
use crate::intensity::IntensityField;
use crate::session::{TraceSession, UpdateOutcome};
use crate::types::{Pixel, TraceError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Read-only access to a per-pixel scalar field.
pub trait ScalarField {
    /// Grid width.
    fn width(&self) -> u32;
    /// Grid height.
    fn height(&self) -> u32;
    /// Value at `(x, y)`; callers stay in bounds.
    fn value(&self, x: u32, y: u32) -> f32;
}

impl ScalarField for IntensityField {
    fn width(&self) -> u32 {
        self.dimensions().width
    }

    fn height(&self) -> u32 {
        self.dimensions().height
    }

    fn value(&self, x: u32, y: u32) -> f32 {
        self.get(x, y)
    }
}

impl ScalarField for CostField {
    fn width(&self) -> u32 {
        self.dimensions().width
    }

    fn height(&self) -> u32 {
        self.dimensions().height
    }

    fn value(&self, x: u32, y: u32) -> f32 {
        self.get(x, y)
    }
}

/// Format the top-left `n x n` corner of a field as a text table.
///
/// The excerpt is clipped to the field's dimensions.
#[must_use]
pub fn excerpt(name: &str, field: &impl ScalarField, n: u32) -> String {
    let cols = n.min(field.width());
    let rows = n.min(field.height());
    let mut out = format!(
        "{name} ({}x{}, top-left {cols}x{rows}):\n",
        field.width(),
        field.height()
    );
    for y in 0..rows {
        let line: Vec<String> = (0..cols)
            .map(|x| format!("{:>8.2}", field.value(x, y)))
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Summary statistics of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Smallest value.
    pub min: f32,
    /// Largest value.
    pub max: f32,
    /// Arithmetic mean.
    pub mean: f64,
}

impl FieldStats {
    /// Compute statistics over every value of `field`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(field: &impl ScalarField) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let count = u64::from(field.width()) * u64::from(field.height());
        for y in 0..field.height() {
            for x in 0..field.width() {
                let v = field.value(x, y);
                min = min.min(v);
                max = max.max(v);
                sum += f64::from(v);
            }
        }
        if count == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        Self {
            min,
            max,
            mean: sum / count as f64,
        }
    }
}

/// Diagnostics for a single construction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Intensity conversion metrics.
    Intensity {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Value statistics.
        stats: FieldStats,
    },
    /// Cost field metrics.
    Cost {
        /// Largest gradient magnitude.
        gmax: f32,
        /// Cost floor (epsilon).
        floor: f32,
        /// Pixels whose cost was raised to the floor.
        floor_pixel_count: usize,
        /// Value statistics.
        stats: FieldStats,
    },
}

/// Diagnostics collected while building the fields for one raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDiagnostics {
    /// Raster to intensity conversion.
    pub intensity: StageDiagnostics,
    /// Gradient and cost mapping.
    pub cost: StageDiagnostics,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl FieldDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Field Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(format!("{:<16} {:>10}  {}", "Stage", "Duration", "Details"));
        lines.push("-".repeat(72));
        for (name, diag) in [("Intensity", &self.intensity), ("Cost", &self.cost)] {
            lines.push(format!(
                "{name:<16} {:>8.3}ms  {}",
                duration_ms(diag.duration),
                format_metrics(&diag.metrics),
            ));
        }
        lines.join("\n")
    }
}

/// Build both fields for `raster`, timing each stage.
///
/// # Errors
///
/// Propagates errors from [`IntensityField::build`] and
/// [`CostField::build`].
pub fn build_fields_with_diagnostics<C: Clock>(
    raster: &RgbImage,
    floor: f32,
    clock: &C,
) -> Result<(IntensityField, CostField, FieldDiagnostics), TraceError> {
    let total_start = clock.now();

    let start = clock.now();
    let intensity = IntensityField::build(raster)?;
    let intensity_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Intensity {
            width: raster.width(),
            height: raster.height(),
            stats: FieldStats::of(&intensity),
        },
    };

    let start = clock.now();
    let cost = CostField::build(&intensity, floor)?;
    let floor_pixel_count = cost
        .as_raw()
        .iter()
        .filter(|&&c| c <= cost.floor())
        .count();
    let cost_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Cost {
            gmax: cost.gmax(),
            floor: cost.floor(),
            floor_pixel_count,
            stats: FieldStats::of(&cost),
        },
    };

    let diagnostics = FieldDiagnostics {
        intensity: intensity_diag,
        cost: cost_diag,
        total_duration: clock.elapsed(&total_start),
    };
    Ok((intensity, cost, diagnostics))
}

/// Diagnostics for one delivered pointer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDiagnostics {
    /// The event as delivered.
    pub event: PointerEvent,
    /// Wall-clock duration of the update (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Nodes settled by the search (0 when no search ran).
    pub settled: usize,
    /// Frontier pushes by the search.
    pub pushed: usize,
    /// Length of the fresh segment.
    pub segment_len: usize,
    /// New seed, when the update re-anchored.
    pub reanchored_to: Option<Pixel>,
    /// Live path length after the update.
    pub accumulated_len: usize,
    /// Frozen history length after the update.
    pub frozen_len: usize,
}

/// Per-event diagnostics for a whole session replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    /// One entry per delivered event, in order.
    pub updates: Vec<UpdateDiagnostics>,
}

impl SessionDiagnostics {
    /// Deliver `event` to `session` and record what happened.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`PointerEvent::apply`]; nothing is recorded
    /// for a failed update.
    pub fn record<C: Clock>(
        &mut self,
        session: &mut TraceSession,
        event: PointerEvent,
        clock: &C,
    ) -> Result<UpdateOutcome, TraceError> {
        let start = clock.now();
        let outcome = event.apply(session)?;
        let duration = clock.elapsed(&start);

        let (settled, pushed, segment_len, reanchored_to) = match &outcome {
            UpdateOutcome::Ignored => (0, 0, 0, None),
            UpdateOutcome::Traced {
                reanchored,
                stats,
                segment_len,
                ..
            } => (
                stats.settled,
                stats.pushed,
                *segment_len,
                reanchored.map(|r| r.new_seed),
            ),
        };
        self.updates.push(UpdateDiagnostics {
            event,
            duration,
            settled,
            pushed,
            segment_len,
            reanchored_to,
            accumulated_len: session.accumulated().len(),
            frozen_len: session.frozen().len(),
        });
        Ok(outcome)
    }

    /// Number of updates that re-anchored the seed.
    #[must_use]
    pub fn reanchor_count(&self) -> usize {
        self.updates
            .iter()
            .filter(|u| u.reanchored_to.is_some())
            .count()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self) -> String {
        let mut out = format!("Session Diagnostics Report\n{}\n", "=".repeat(60));
        let total: Duration = self.updates.iter().map(|u| u.duration).sum();
        let max_settled = self.updates.iter().map(|u| u.settled).max().unwrap_or(0);
        let mean_ms = if self.updates.is_empty() {
            0.0
        } else {
            duration_ms(total) / self.updates.len() as f64
        };
        let _ = writeln!(
            out,
            "Events: {}  |  Re-anchors: {}  |  Total: {:.3}ms  |  Mean: {mean_ms:.3}ms  |  Max settled: {max_settled}",
            self.updates.len(),
            self.reanchor_count(),
            duration_ms(total),
        );
        let _ = writeln!(
            out,
            "{:<28} {:>10} {:>9} {:>8} {:>8} {:>8}",
            "Event", "Duration", "Settled", "Segment", "Live", "Frozen"
        );
        out.push_str(&"-".repeat(76));
        for u in &self.updates {
            let label = match u.event {
                PointerEvent::PlaceSeed { x, y } => format!("seed ({x}, {y})"),
                PointerEvent::MoveCursor { x, y } => format!("move ({x}, {y})"),
            };
            let label = match u.reanchored_to {
                Some(p) => format!("{label} ^{p}"),
                None => label,
            };
            let _ = write!(
                out,
                "\n{label:<28} {:>8.3}ms {:>9} {:>8} {:>8} {:>8}",
                duration_ms(u.duration),
                u.settled,
                u.segment_len,
                u.accumulated_len,
                u.frozen_len,
            );
        }
        out
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Intensity {
            width,
            height,
            stats,
        } => format!(
            "{width}x{height} min={:.1} max={:.1} mean={:.1}",
            stats.min, stats.max, stats.mean
        ),
        StageMetrics::Cost {
            gmax,
            floor,
            floor_pixel_count,
            stats,
        } => format!(
            "gmax={gmax:.2} floor={floor} at_floor={floor_pixel_count} mean={:.2}",
            stats.mean
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::TraceConfig;

    /// Deterministic clock: every reading advances by one millisecond.
    struct StepClock(Cell<u64>);

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    fn gradient_raster() -> RgbImage {
        RgbImage::from_fn(12, 8, |x, _| {
            let v = if x < 6 { 20 } else { 230 };
            image::Rgb([v, v, v])
        })
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        assert!((duration_ms(d) - 1234.0).abs() < 0.01);
    }

    #[test]
    fn excerpt_is_clipped_to_field() {
        let raster = RgbImage::from_pixel(3, 2, image::Rgb([10, 10, 10]));
        let field = IntensityField::build(&raster).unwrap();
        let text = excerpt("gray", &field, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("gray (3x2, top-left 3x2)"));
        assert_eq!(lines[1].split_whitespace().count(), 3);
        assert!(lines[1].contains("10.00"));
    }

    #[test]
    fn field_stats_computes() {
        let raster = RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([100, 100, 100])
            }
        });
        let field = IntensityField::build(&raster).unwrap();
        let stats = FieldStats::of(&field);
        assert!(stats.min.abs() < 1e-3);
        assert!((stats.max - 100.0).abs() < 1e-2);
        assert!((stats.mean - 50.0).abs() < 1e-2);
    }

    #[test]
    fn field_diagnostics_report_stages() {
        let clock = StepClock(Cell::new(0));
        let (intensity, cost, diag) =
            build_fields_with_diagnostics(&gradient_raster(), 1.0, &clock).unwrap();
        assert_eq!(intensity.dimensions(), cost.dimensions());
        assert!(diag.total_duration >= diag.intensity.duration + diag.cost.duration);
        let StageMetrics::Cost {
            floor_pixel_count, ..
        } = diag.cost.metrics
        else {
            unreachable!("cost stage records cost metrics");
        };
        // Columns 5 and 6 straddle the step.
        assert_eq!(floor_pixel_count, 16);
        let report = diag.report();
        assert!(report.contains("Field Diagnostics Report"));
        assert!(report.contains("gmax="));
    }

    #[test]
    fn session_diagnostics_record_updates() {
        let clock = StepClock(Cell::new(0));
        let (_, cost, _) = build_fields_with_diagnostics(&gradient_raster(), 1.0, &clock).unwrap();
        let mut session = TraceSession::new(cost, TraceConfig::default()).unwrap();
        let mut diag = SessionDiagnostics::default();
        diag.record(&mut session, PointerEvent::PlaceSeed { x: 0, y: 0 }, &clock)
            .unwrap();
        diag.record(&mut session, PointerEvent::MoveCursor { x: 11, y: 7 }, &clock)
            .unwrap();
        assert_eq!(diag.updates.len(), 2);
        assert_eq!(diag.updates[0].settled, 0);
        assert!(diag.updates[1].settled > 0);
        assert_eq!(
            diag.updates[1].accumulated_len,
            session.accumulated().len()
        );
        assert_eq!(diag.reanchor_count(), 0);
        let report = diag.report();
        assert!(report.contains("move (11, 7)"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let clock = StepClock(Cell::new(0));
        let (_, _, diag) = build_fields_with_diagnostics(&gradient_raster(), 1.0, &clock).unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["total_duration"].is_f64());
        let back: FieldDiagnostics = serde_json::from_value(json).unwrap();
        let delta = back.total_duration.as_secs_f64() - diag.total_duration.as_secs_f64();
        assert!(delta.abs() < 1e-9);
    }
}
