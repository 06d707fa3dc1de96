mod common;

use egui::{Pos2, Rect, Vec2};
use maskup::binarize::{MASK_OFF, MASK_ON, binarize};
use maskup::{PaintEngine, PaintError, PaintSettings};

fn engine() -> PaintEngine {
    PaintEngine::new(PaintSettings::default())
}

#[test]
fn daub_lands_at_display_point_divided_by_scale() {
    let mut store = common::store(&[("dog.png", 800, 600)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();

    // Shown at half size: display (100, 100) is bitmap (200, 200)
    engine.set_display_rect(Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0)));
    engine.begin_stroke(&mut store, Pos2::new(100.0, 100.0)).unwrap();
    engine.end_stroke(&mut store).unwrap();

    let id = store.image(0).unwrap().id();
    let mask = store.annotation(id).unwrap().mask.clone().unwrap();
    assert_eq!(mask.get_pixel(200, 200).0[3], 255);
    assert_eq!(mask.get_pixel(100, 100).0[3], 0);
}

#[test]
fn display_offset_is_removed_before_scaling() {
    let mut store = common::store(&[("dog.png", 800, 600)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();
    engine.set_display_rect(Rect::from_min_size(Pos2::new(50.0, 30.0), Vec2::new(200.0, 150.0)));

    engine.begin_stroke(&mut store, Pos2::new(150.0, 105.0)).unwrap();
    engine.end_stroke(&mut store).unwrap();

    // (150-50, 105-30) * 4 = (400, 300)
    let id = store.image(0).unwrap().id();
    let mask = store.mask_layer(id).unwrap();
    assert_eq!(mask.pixels().get_pixel(400, 300).0[3], 255);
    assert_eq!(mask.pixels().get_pixel(150, 105).0[3], 0);
}

#[test]
fn stroke_updates_the_preview_immediately_and_commits_on_end() {
    let mut store = common::store(&[("dog.png", 800, 600)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();
    let id = store.image(0).unwrap().id();
    let before = engine.composite_version();

    engine.begin_stroke(&mut store, Pos2::new(400.0, 300.0)).unwrap();
    engine.continue_stroke(&mut store, Pos2::new(430.0, 300.0)).unwrap();

    assert!(engine.composite_version() > before);
    // Image (90,120,150) under paint (196,64,219) at half opacity
    assert_eq!(engine.composite().unwrap().get_pixel(400, 300).0, [143, 92, 185, 255]);
    assert!(store.annotation(id).is_none(), "nothing is committed mid-stroke");

    engine.end_stroke(&mut store).unwrap();

    let mask = store.annotation(id).unwrap().mask.clone().unwrap();
    let bw = binarize(&mask);
    assert_eq!(*bw.get_pixel(400, 300), MASK_ON);
    assert_eq!(*bw.get_pixel(430, 300), MASK_ON);
    assert_eq!(*bw.get_pixel(0, 0), MASK_OFF);
    assert_eq!(store.annotated_count(), 1);
}

#[test]
fn clear_wipes_the_mask_and_commits_no_mask() {
    let mut store = common::store(&[("dog.png", 80, 60)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();
    let id = store.image(0).unwrap().id();
    store.set_prompt(id, "keep me");

    engine.begin_stroke(&mut store, Pos2::new(40.0, 30.0)).unwrap();
    engine.end_stroke(&mut store).unwrap();
    engine.clear(&mut store).unwrap();

    let annotation = store.annotation(id).unwrap();
    assert!(annotation.mask.is_none());
    assert_eq!(annotation.prompt, "keep me");
    assert!(store.mask_layer(id).unwrap().is_blank());
    assert_eq!(engine.composite().unwrap(), store.image(0).unwrap().pixels());
}

#[test]
fn switching_back_restores_the_committed_mask() {
    let mut store = common::store(&[("a.png", 100, 100), ("b.png", 50, 80)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();
    engine.begin_stroke(&mut store, Pos2::new(50.0, 50.0)).unwrap();
    engine.end_stroke(&mut store).unwrap();

    engine.activate(&mut store, 1).unwrap();
    assert_eq!(engine.composite().unwrap().dimensions(), (50, 80));
    assert_eq!(
        engine.composite().unwrap().get_pixel(25, 40),
        store.image(1).unwrap().pixels().get_pixel(25, 40),
        "second image starts unpainted"
    );

    engine.activate(&mut store, 0).unwrap();
    let composite = engine.composite().unwrap();
    assert_eq!(composite.dimensions(), (100, 100));
    assert_ne!(composite.get_pixel(50, 50), store.image(0).unwrap().pixels().get_pixel(50, 50));
}

#[test]
fn brush_range_follows_the_active_image() {
    let mut store = common::store(&[("small.png", 200, 100), ("big.png", 1000, 2000)]);
    let mut engine = engine();

    engine.activate(&mut store, 0).unwrap();
    assert_eq!(engine.brush().range(), 5.0..=7.0);

    engine.activate(&mut store, 1).unwrap();
    assert_eq!(engine.brush().range(), 5.0..=70.0);
    assert_eq!(engine.set_brush_size(3.0), 5.0);
    assert_eq!(engine.set_brush_size(30.0), 30.0);
}

#[test]
fn operations_after_reset_report_no_active_image() {
    let mut store = common::store(&[("a.png", 10, 10)]);
    let mut engine = engine();
    engine.activate(&mut store, 0).unwrap();
    store.reset();

    assert_eq!(engine.clear(&mut store), Err(PaintError::NoActiveImage));
    assert_eq!(engine.activate(&mut store, 0), Err(PaintError::IndexOutOfRange { index: 0, len: 0 }));
}
