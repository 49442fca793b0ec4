//! End-to-end tracing scenarios over synthetic rasters.

#![allow(clippy::unwrap_used)]

use livewire_core::search::{self, SearchWorkspace, path_cost};
use livewire_core::{
    CostField, IntensityField, Pixel, PointerEvent, RgbImage, SessionState, TraceConfig,
    TraceSession, UpdateOutcome, open_session,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn px(x: u32, y: u32) -> Pixel {
    Pixel::new(x, y)
}

fn gray_raster(w: u32, h: u32, f: impl Fn(u32, u32) -> u8) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let v = f(x, y);
        image::Rgb([v, v, v])
    })
}

fn cost_of(raster: &RgbImage) -> CostField {
    let intensity = IntensityField::build(raster).unwrap();
    CostField::build(&intensity, TraceConfig::DEFAULT_COST_FLOOR).unwrap()
}

#[allow(clippy::cast_possible_truncation)]
fn textured(w: u32, h: u32) -> RgbImage {
    gray_raster(w, h, |x, y| ((x * 29 + y * 13 + (x * y) % 7 * 31) % 256) as u8)
}

#[test]
fn uniform_gray_traces_the_diagonal() {
    init_logging();
    let cost = cost_of(&gray_raster(5, 5, |_, _| 128));
    assert!(cost.gmax().abs() < f32::EPSILON);
    assert!(
        cost.as_raw()
            .iter()
            .all(|&c| (c - TraceConfig::DEFAULT_COST_FLOOR).abs() < f32::EPSILON)
    );

    let path = search::find_path(&cost, px(0, 0), px(4, 4)).unwrap();
    assert_eq!(
        path.pixels(),
        &[px(0, 0), px(1, 1), px(2, 2), px(3, 3), px(4, 4)]
    );
}

#[test]
fn path_bends_along_vertical_edge() {
    init_logging();
    // Bright from column 2 onwards: columns 1 and 2 carry the edge.
    let raster = gray_raster(5, 9, |x, _| if x < 2 { 0 } else { 255 });
    let cost = cost_of(&raster);
    let from = px(0, 0);
    let to = px(4, 8);

    let path = search::find_path(&cost, from, to).unwrap();
    assert_eq!(path.first(), Some(&from));
    assert_eq!(path.last(), Some(&to));
    assert!(path.is_connected());

    let on_edge = path.pixels().iter().filter(|p| p.x == 1 || p.x == 2).count();
    assert!(
        on_edge >= 8,
        "expected the path to run along the edge, got {:?}",
        path.pixels()
    );

    let straight = [
        px(0, 0),
        px(1, 1),
        px(1, 2),
        px(2, 3),
        px(2, 4),
        px(3, 5),
        px(3, 6),
        px(4, 7),
        px(4, 8),
    ];
    assert!(path_cost(&cost, path.pixels()) < path_cost(&cost, &straight));
}

#[test]
fn search_is_deterministic() {
    init_logging();
    let cost = cost_of(&textured(40, 30));
    let first = search::find_path(&cost, px(2, 27), px(37, 1)).unwrap();
    for _ in 0..5 {
        let again = search::find_path(&cost, px(2, 27), px(37, 1)).unwrap();
        assert_eq!(first, again);
    }

    let mut workspace = SearchWorkspace::new();
    for _ in 0..3 {
        let (reused, _) = search::find_path_in(&mut workspace, &cost, px(2, 27), px(37, 1)).unwrap();
        assert_eq!(first, reused);
    }
}

#[test]
fn direct_path_never_costs_more_than_a_detour() {
    let cost = cost_of(&textured(24, 24));
    let points = [px(0, 0), px(23, 23), px(5, 17), px(18, 3), px(12, 12)];
    for &a in &points {
        for &b in &points {
            for &c in &points {
                let direct = path_cost(&cost, search::find_path(&cost, a, c).unwrap().pixels());
                let first = path_cost(&cost, search::find_path(&cost, a, b).unwrap().pixels());
                let second = path_cost(&cost, search::find_path(&cost, b, c).unwrap().pixels());
                assert!(
                    direct <= first + second + 1e-9,
                    "{a} -> {c} costs {direct}, via {b} costs {}",
                    first + second,
                );
            }
        }
    }
}

#[test]
fn session_reanchors_at_default_bound() {
    init_logging();
    let mut session = open_session(&gray_raster(300, 3, |_, _| 60), TraceConfig::default()).unwrap();
    session.place_seed(px(0, 1)).unwrap();
    session.move_cursor(px(150, 1)).unwrap();

    let before = session.accumulated().pixels().to_vec();
    assert_eq!(before.len(), 151);
    assert!(before.len() > TraceConfig::DEFAULT_MAX_LENGTH);

    let outcome = session.move_cursor(px(160, 1)).unwrap();
    let expected_seed = before[before.len() / 2];
    assert!(matches!(
        outcome,
        UpdateOutcome::Traced {
            reanchored: Some(r),
            ..
        } if r.new_seed == expected_seed
    ));
    assert_eq!(session.seed(), Some(expected_seed));
    assert_eq!(session.accumulated().first(), Some(&expected_seed));
    assert_eq!(session.frozen(), &before[..before.len() / 2]);
}

#[test]
fn merged_path_has_no_repeated_pixels() {
    let mut session = open_session(&textured(32, 32), TraceConfig::default()).unwrap();
    session.place_seed(px(3, 3)).unwrap();
    let outcome = session.move_cursor(px(28, 20)).unwrap();
    assert!(matches!(outcome, UpdateOutcome::Traced { appended: true, .. }));
    let pixels = session.accumulated().pixels();
    assert!(pixels.windows(2).all(|w| w[0] != w[1]));
    assert!(session.accumulated().is_connected());
}

#[test]
fn replayed_events_build_a_contiguous_boundary() {
    init_logging();
    let config = TraceConfig {
        max_length: 30,
        ..TraceConfig::default()
    };
    let mut session = TraceSession::new(cost_of(&textured(64, 48)), config).unwrap();
    let mut queue = livewire_core::EventQueue::new();
    queue.push(PointerEvent::PlaceSeed { x: 2, y: 2 });
    let mut outcomes = Vec::new();
    for step in 1..=30 {
        queue.push(PointerEvent::MoveCursor {
            x: step * 2,
            y: 2 + step,
        });
        if step % 3 == 0 {
            outcomes.extend(queue.drain_into(&mut session).unwrap());
        }
    }
    outcomes.extend(queue.drain_into(&mut session).unwrap());

    assert!(matches!(session.state(), SessionState::Tracking { .. }));
    assert_eq!(session.cursor(), Some(px(60, 32)));
    let boundary = session.boundary();
    assert_eq!(boundary.first(), Some(&px(2, 2)));
    assert_eq!(boundary.last(), Some(&px(60, 32)));
    assert!(boundary.is_connected());
    // 1 seed + 10 coalesced move batches.
    assert_eq!(outcomes.len(), 11);
}
