//! Detection pipeline behaviour over rendered codes and blank frames

mod support;

use screen_qr::config::PipelineConfig;
use screen_qr::engine::{Backend, EngineSet, GeometricEngine, LinearEngine};
use screen_qr::models::{EngineKind, Frame, Stage};
use screen_qr::pipeline::Pipeline;
use screen_qr::symbol::EcLevel;
use screen_qr::transform::TransformKind;
use support::{Blind, Broken, Canvas, TileOnly};

const URL: &str = "https://web.whatsapp.com/pair?ref=42";

fn coded_frame() -> Frame {
    support::render(&support::encode(URL, 3, EcLevel::M, 4), 4, 4)
}

#[test]
fn test_geometric_engine_reads_rendered_code() {
    let hit = Pipeline::standard().detect(&coded_frame()).unwrap().unwrap();
    assert_eq!(hit.text(), URL);
    assert_eq!(hit.engine(), EngineKind::Geometric);
    assert_eq!(hit.stage(), Stage::Raw);
    assert_eq!(hit.tile(), None);
}

#[test]
fn test_linear_engine_reads_rendered_code() {
    let engines = EngineSet::new(vec![Box::new(LinearEngine::new())]);
    let pipeline = Pipeline::new(engines, PipelineConfig::default());
    let hit = pipeline.detect(&coded_frame()).unwrap().unwrap();
    assert_eq!(hit.text(), URL);
    assert_eq!(hit.engine(), EngineKind::Linear);
}

#[test]
fn test_light_on_dark_code_needs_inversion() {
    let frame = screen_qr::transform::invert(&coded_frame()).unwrap();
    let config = PipelineConfig {
        transforms: vec![TransformKind::Grayscale, TransformKind::Invert],
        scales: Vec::new(),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(EngineSet::standard(), config);
    let hit = pipeline.detect(&frame).unwrap().unwrap();
    assert_eq!(hit.text(), URL);
    assert_eq!(hit.stage(), Stage::Transformed(TransformKind::Invert));
}

#[test]
fn test_raw_attempts_precede_transforms() {
    let pipeline = Pipeline::standard();
    let engines = pipeline.engines().available_count();
    let blank = Frame::filled(300, 300, 255).unwrap();
    let (hit, trace) = pipeline.detect_traced(&blank).unwrap();
    assert!(hit.is_none());

    let attempts = trace.attempts();
    assert!(attempts[..engines].iter().all(|a| a.stage == Stage::Raw));
    assert!(attempts[engines..].iter().all(|a| a.stage != Stage::Raw));
    let order: Vec<EngineKind> = attempts[..engines].iter().map(|a| a.engine).collect();
    assert_eq!(order, vec![EngineKind::Geometric, EngineKind::Linear]);

    // Each transform is tried by every engine before the next transform
    let stages: Vec<Stage> = attempts.iter().map(|a| a.stage).collect();
    let expected: Vec<Stage> = std::iter::once(Stage::Raw)
        .chain(TransformKind::DEFAULT_SEQUENCE.into_iter().map(Stage::Transformed))
        .chain([Stage::Rescaled(2.0)])
        .flat_map(|s| std::iter::repeat_n(s, engines))
        .collect();
    assert_eq!(stages, expected);
}

#[test]
fn test_detect_is_idempotent() {
    let pipeline = Pipeline::standard();
    let frame = coded_frame();
    let (first, first_trace) = pipeline.detect_traced(&frame).unwrap();
    let (second, second_trace) = pipeline.detect_traced(&frame).unwrap();
    assert_eq!(first, second);
    assert_eq!(first_trace, second_trace);

    let blank = Frame::filled(120, 120, 200).unwrap();
    assert_eq!(pipeline.detect(&blank).unwrap(), pipeline.detect(&blank).unwrap());
}

#[test]
fn test_blank_frame_attempt_count() {
    let pipeline = Pipeline::standard();
    let blank = Frame::filled(900, 900, 255).unwrap();
    let (hit, trace) = pipeline.detect_traced(&blank).unwrap();
    assert!(hit.is_none());

    let engines = pipeline.engines().available_count();
    let transforms = pipeline.config().transforms.len();
    let scales = pipeline.admissible_scales(900, 900).len();
    let tiles = pipeline.tile_plan(900, 900).len();
    assert_eq!((engines, transforms, scales, tiles), (2, 5, 1, 16));
    assert_eq!(
        trace.len(),
        engines * (1 + transforms + scales) + tiles * engines * (1 + transforms)
    );
    assert_eq!(trace.len(), 206);
    assert_eq!(trace.tiles_visited().len(), 16);
}

#[test]
fn test_max_tiles_bounds_the_scan() {
    let config = PipelineConfig {
        max_tiles: Some(3),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(EngineSet::new(vec![Box::new(Blind(EngineKind::Linear))]), config);
    let blank = Frame::filled(900, 900, 255).unwrap();
    let (_, trace) = pipeline.detect_traced(&blank).unwrap();
    assert_eq!(trace.tiles_visited(), vec![(0, 0), (200, 0), (400, 0)]);
    assert_eq!(trace.len(), (1 + 5 + 1) + 3 * (1 + 5));
}

#[test]
fn test_tiled_scan_finds_codes_near_tile_boundaries() {
    // 165 px code (25 modules plus quiet zone, 5 px each)
    let grid = support::encode("tile", 2, EcLevel::L, 1);
    let module = 5;
    let side = (grid.width() + 8) * module;
    assert!(side <= 200);

    let positions = [
        (320, 60),                 // straddles the x = 400 tile edge
        (60, 320),                 // straddles the y = 400 tile edge
        (320, 320),                // straddles both
        (900 - side, 900 - side),  // flush with the bottom-right corner
        ((900 - side) / 2, (900 - side) / 2),
    ];
    for (x, y) in positions {
        let mut canvas = Canvas::new(900, 900);
        canvas.draw(&grid, module, x + 4 * module, y + 4 * module);
        let frame = canvas.into_frame();

        let engines = EngineSet::new(vec![Box::new(TileOnly {
            max_side: 400,
            inner: GeometricEngine::new(),
        })]);
        let pipeline = Pipeline::new(engines, PipelineConfig::default());
        let hit = pipeline.detect(&frame).unwrap();
        let hit = hit.unwrap_or_else(|| panic!("code at {},{} not found", x, y));
        assert_eq!(hit.text(), "tile");
        let (tx, ty) = hit.tile().expect("hit came from a tile");
        assert!(tx <= x && x + side <= tx + 400, "tile {},{} for code at {},{}", tx, ty, x, y);
        assert!(ty <= y && y + side <= ty + 400);
    }
}

#[test]
fn test_unavailable_engine_is_skipped() {
    let backends: Vec<Box<dyn Backend>> = vec![
        Box::new(Broken(EngineKind::Neural)),
        Box::new(GeometricEngine::new()),
        Box::new(LinearEngine::new()),
    ];
    let pipeline = Pipeline::new(EngineSet::new(backends), PipelineConfig::default());

    let status = pipeline.engines().capability_status();
    assert_eq!(status[0].kind, EngineKind::Neural);
    assert!(!status[0].available);
    assert_eq!(status[0].reason.as_deref(), Some("neural engine unavailable: model file missing"));

    let (hit, trace) = pipeline.detect_traced(&coded_frame()).unwrap();
    assert_eq!(hit.unwrap().text(), URL);
    assert!(trace.attempts().iter().all(|a| a.engine != EngineKind::Neural));
}

#[test]
fn test_standard_set_reports_neural_unavailable() {
    let pipeline = Pipeline::standard();
    let neural = pipeline
        .engines()
        .capability_status()
        .into_iter()
        .find(|d| d.kind == EngineKind::Neural)
        .unwrap();
    assert!(!neural.available);
    assert!(neural.reason.is_some());
    assert!(pipeline.detect(&coded_frame()).unwrap().is_some());
}
