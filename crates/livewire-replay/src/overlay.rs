//! Preview overlay: the traced boundary and markers drawn over the image.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use livewire_core::{Pixel, SessionSnapshot, SessionState};

/// Boundary stroke colour.
const PATH_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Seed marker colour.
const SEED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Cursor marker colour.
const CURSOR_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
/// Marker radius in pixels.
const MARKER_RADIUS: i32 = 3;

#[allow(clippy::cast_precision_loss)]
fn center(p: Pixel) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

#[allow(clippy::cast_possible_wrap)]
const fn marker(p: Pixel) -> (i32, i32) {
    (p.x as i32, p.y as i32)
}

/// Draw the frozen history and live path in red, the seed in green and
/// the cursor in blue on a copy of `raster`.
#[must_use]
pub fn render(raster: &RgbImage, snapshot: &SessionSnapshot) -> RgbImage {
    let mut canvas = raster.clone();

    let boundary: Vec<Pixel> = snapshot
        .frozen
        .iter()
        .chain(snapshot.accumulated.pixels())
        .copied()
        .collect();
    log::debug!(
        "overlay: {} boundary pixels on {}x{}",
        boundary.len(),
        canvas.width(),
        canvas.height()
    );
    for pair in boundary.windows(2) {
        draw_line_segment_mut(&mut canvas, center(pair[0]), center(pair[1]), PATH_COLOR);
    }
    if let [only] = boundary.as_slice() {
        canvas.put_pixel(only.x, only.y, PATH_COLOR);
    }

    if let SessionState::Tracking { seed } = snapshot.state {
        draw_filled_circle_mut(&mut canvas, marker(seed), MARKER_RADIUS, SEED_COLOR);
    }
    if let Some(cursor) = snapshot.cursor {
        draw_filled_circle_mut(&mut canvas, marker(cursor), MARKER_RADIUS, CURSOR_COLOR);
    }
    canvas
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use livewire_core::{PixelPath, TraceConfig, open_session};

    use super::*;

    #[test]
    fn idle_snapshot_leaves_image_untouched() {
        let raster = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
        let session = open_session(&raster, TraceConfig::default()).unwrap();
        let out = render(&raster, &session.snapshot());
        assert_eq!(out, raster);
    }

    #[test]
    fn path_and_markers_are_drawn() {
        let raster = RgbImage::from_pixel(30, 30, Rgb([9, 9, 9]));
        let mut session = open_session(&raster, TraceConfig::default()).unwrap();
        session.place_seed(Pixel::new(5, 15)).unwrap();
        session.move_cursor(Pixel::new(25, 15)).unwrap();
        let out = render(&raster, &session.snapshot());

        assert_eq!(*out.get_pixel(15, 15), PATH_COLOR);
        assert_eq!(*out.get_pixel(5, 15), SEED_COLOR);
        assert_eq!(*out.get_pixel(25, 15), CURSOR_COLOR);
        assert_eq!(*out.get_pixel(15, 2), Rgb([9, 9, 9]));
    }

    #[test]
    fn single_pixel_boundary_is_marked() {
        let raster = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let snapshot = SessionSnapshot {
            state: SessionState::Idle,
            cursor: None,
            accumulated: PixelPath::new(vec![Pixel::new(1, 2)]),
            frozen: Vec::new(),
            dimensions: livewire_core::Dimensions {
                width: 4,
                height: 4,
            },
        };
        let out = render(&raster, &snapshot);
        assert_eq!(*out.get_pixel(1, 2), PATH_COLOR);
    }
}
