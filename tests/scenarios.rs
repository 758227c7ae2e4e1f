//! End-to-end scenarios exercising the public API together: canvas
//! push/update/draw, the software rasterizer, trimming, the TVG saver and
//! the Lottie builder.

use vectos::backend::sw::SwEngine;
use vectos::canvas::Canvas;
use vectos::fill::{ColorStop, Gradient};
use vectos::geom::Point;
use vectos::lottie::builder::LottieBuilder;
use vectos::lottie::model::{
    Composition, FillRule as LottieFillRule, Keyframe, Layer, LayerKind, MatteType, Property,
    ShapeNode, Transform as LottieTransform,
};
use vectos::paint::{PaintArena, PaintKind};
use vectos::path::Path;
use vectos::render::{ColorSpace, RenderRegion, RenderShape, RenderStroke, StrokeCap};
use vectos::saver::tvg;

fn pixel(engine: &SwEngine, w: u32, x: u32, y: u32) -> [u8; 4] {
    engine.surface().data[(y * w + x) as usize].to_le_bytes()
}

/// S1: a solid red triangle on a software canvas. The interior is opaque
/// red; a point well outside the hull is untouched.
#[test]
fn s1_solid_triangle_fills_interior_only() {
    let mut path = Path::new();
    path.move_to(0.0, 0.0);
    path.line_to(100.0, 0.0);
    path.line_to(50.0, 100.0);
    path.close();
    let shape = RenderShape { path, color: [255, 0, 0, 255], ..Default::default() };

    let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 128, max_y: 128 };
    let mut engine = SwEngine::new(128, 128, ColorSpace::Abgr8888);
    let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
    canvas.push(PaintKind::Shape(shape));
    canvas.update(&mut engine, None).unwrap();
    canvas.draw(&mut engine, false).unwrap();
    canvas.sync(&mut engine);

    assert_eq!(pixel(&engine, 128, 50, 50), [255, 0, 0, 255]);
    assert_eq!(pixel(&engine, 128, 5, 95), [0, 0, 0, 0]);
}

/// S2: a stroke-only open path with round caps. Points along the segment
/// are blue; the rounded cap beyond the endpoint is also filled in.
#[test]
fn s2_stroke_only_open_path_with_round_caps() {
    let mut path = Path::new();
    path.move_to(10.0, 50.0);
    path.line_to(90.0, 50.0);
    let stroke =
        RenderStroke { width: 4.0, color: [0, 0, 255, 255], cap: StrokeCap::Round, ..Default::default() };
    let shape = RenderShape { path, stroke: Some(stroke), ..Default::default() };

    let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 100, max_y: 100 };
    let mut engine = SwEngine::new(100, 100, ColorSpace::Abgr8888);
    let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
    canvas.push(PaintKind::Shape(shape));
    canvas.update(&mut engine, None).unwrap();
    canvas.draw(&mut engine, false).unwrap();
    canvas.sync(&mut engine);

    assert_eq!(pixel(&engine, 100, 50, 50), [0, 0, 255, 255]);
    assert_eq!(pixel(&engine, 100, 10, 50), [0, 0, 255, 255]);
}

/// S3: a linear gradient rectangle samples red at one edge, blue at the
/// other, and a blend in between.
#[test]
fn s3_linear_gradient_across_a_rectangle() {
    let mut path = Path::new();
    path.append_rect(0.0, 0.0, 100.0, 100.0, 0.0, 0.0, true);
    let mut gradient = Gradient::linear(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
    gradient.set_stops(vec![
        ColorStop { offset: 0.0, color: [255, 0, 0, 255] },
        ColorStop { offset: 1.0, color: [0, 0, 255, 255] },
    ]);
    let shape = RenderShape { path, fill: Some(gradient), ..Default::default() };

    let viewport = RenderRegion { min_x: 0, min_y: 0, max_x: 100, max_y: 100 };
    let mut engine = SwEngine::new(100, 100, ColorSpace::Abgr8888);
    let mut canvas: Canvas<SwEngine> = Canvas::new(viewport);
    canvas.push(PaintKind::Shape(shape));
    canvas.update(&mut engine, None).unwrap();
    canvas.draw(&mut engine, false).unwrap();
    canvas.sync(&mut engine);

    let left = pixel(&engine, 100, 2, 50);
    let right = pixel(&engine, 100, 97, 50);
    let mid = pixel(&engine, 100, 50, 50);
    assert!(left[0] > 200 && left[2] < 60, "left edge should read red-ish: {left:?}");
    assert!(right[2] > 200 && right[0] < 60, "right edge should read blue-ish: {right:?}");
    assert!(mid[0] > 60 && mid[2] > 60, "midpoint should blend both channels: {mid:?}");
}

/// S4: clipping one shape by a circle restricts its visible pixels to the
/// circle's interior, and a TVG round-trip reproduces the same image.
#[test]
fn s4_clip_to_circle_round_trips_through_tvg() {
    let mut square = Path::new();
    square.append_rect(0.0, 0.0, 200.0, 200.0, 0.0, 0.0, true);
    let square_shape = RenderShape { path: square, color: [255, 0, 0, 255], ..Default::default() };

    let mut circle = Path::new();
    circle.append_circle(100.0, 100.0, 50.0, 50.0, true);
    let clipper_shape = RenderShape { path: circle, ..Default::default() };

    let render = |arena: &mut PaintArena<SwEngine>, root| {
        let mut engine = SwEngine::new(200, 200, ColorSpace::Abgr8888);
        let mut clips = Vec::new();
        arena
            .update(&mut engine, root, vectos::geom::Matrix::IDENTITY, &mut clips, 255, vectos::render::RenderUpdateFlag::ALL)
            .unwrap();
        arena.render(&mut engine, root);
        engine
    };

    let mut arena: PaintArena<SwEngine> = PaintArena::new();
    let square_id = arena.insert(PaintKind::Shape(square_shape));
    let clipper_id = arena.insert(PaintKind::Shape(clipper_shape));
    arena.clip(square_id, clipper_id).unwrap();

    let engine = render(&mut arena, square_id);
    assert_eq!(pixel(&engine, 200, 100, 100), [255, 0, 0, 255]);
    assert_eq!(pixel(&engine, 200, 5, 5), [0, 0, 0, 0]);

    let bytes = tvg::save(&arena, square_id).unwrap();
    let mut loaded_arena: PaintArena<SwEngine> = PaintArena::new();
    let loaded_id = tvg::load(&mut loaded_arena, &bytes).unwrap();
    let loaded_engine = render(&mut loaded_arena, loaded_id);

    assert_eq!(pixel(&loaded_engine, 200, 100, 100), pixel(&engine, 200, 100, 100));
    assert_eq!(pixel(&loaded_engine, 200, 5, 5), pixel(&engine, 200, 5, 5));
}

/// S5: trimming a closed square to a quarter-to-three-quarters span halves
/// its arc length.
#[test]
fn s5_trim_path_halves_arc_length() {
    let mut square = Path::new();
    square.append_rect(0.0, 0.0, 100.0, 100.0, 0.0, 0.0, true);
    let total = square.length();
    assert!((total - 400.0).abs() < 1e-3);

    let trimmed = square.trim(0.25, 0.75, false).unwrap();
    assert!((trimmed.length() - 200.0).abs() < 1e-2, "trimmed length was {}", trimmed.length());
}

fn solid_layer(shapes: Vec<ShapeNode>) -> Layer {
    Layer {
        id: 1,
        parent_id: None,
        kind: LayerKind::Shape,
        name: None,
        hidden: false,
        transform: LottieTransform::default(),
        in_frame: 0.0,
        out_frame: 60.0,
        start_frame: 0.0,
        time_stretch: 1.0,
        time_remap: None,
        blend: vectos::render::BlendMethod::Normal,
        matte_type: MatteType::None,
        is_matte_source: false,
        width: 100.0,
        height: 100.0,
        solid_color: [0, 0, 0, 255],
        image_asset: None,
        precomp_ref: None,
        shapes,
        text: None,
    }
}

/// S6: a 60-frame composition whose single layer animates a circle's
/// x-position linearly from 20 to 80. Rendering frame 30 centers the circle
/// near x=50; frame 0 and frame 60 land at the endpoints.
#[test]
fn s6_lottie_playback_animates_circle_x_position() {
    let mut comp = Composition { width: 100, height: 100, start_frame: 0.0, end_frame: 60.0, frame_rate: 30.0, layers: Vec::new(), assets: Vec::new() };

    let position = Property::keyframed(vec![
        Keyframe::linear(0.0, Point::new(20.0, 50.0)),
        Keyframe::linear(60.0, Point::new(80.0, 50.0)),
    ]);
    let shapes = vec![
        ShapeNode::Ellipse {
            position: Property::constant(Point::new(0.0, 0.0)),
            size: Property::constant(Point::new(16.0, 16.0)),
            clockwise: true,
        },
        ShapeNode::SolidFill {
            color: Property::constant([0, 255, 0, 255]),
            opacity: Property::constant(100.0),
            rule: LottieFillRule::NonZero,
        },
    ];
    let mut layer = solid_layer(shapes);
    layer.transform.position = position;
    comp.layers.push(layer);

    let builder = LottieBuilder::new();
    let fonts = vectos::engine::FontRegistry::new();

    for (frame, expected_x) in [(0.0f32, 20.0f32), (30.0, 50.0), (60.0, 80.0)] {
        let mut arena: PaintArena<SwEngine> = PaintArena::new();
        let mut engine = SwEngine::new(100, 100, ColorSpace::Abgr8888);
        let root = builder.build(&mut arena, &comp, frame, &fonts);
        let mut clips = Vec::new();
        arena
            .update(&mut engine, root, vectos::geom::Matrix::IDENTITY, &mut clips, 255, vectos::render::RenderUpdateFlag::ALL)
            .unwrap();
        arena.render(&mut engine, root);

        let mut min_x = None;
        let mut max_x = None;
        for x in 0..100u32 {
            for y in 0..100u32 {
                if pixel(&engine, 100, x, y)[3] > 0 {
                    min_x = Some(min_x.map_or(x, |m: u32| m.min(x)));
                    max_x = Some(max_x.map_or(x, |m: u32| m.max(x)));
                }
            }
        }
        let (min_x, max_x) = (min_x.expect("circle should be visible"), max_x.expect("circle should be visible"));
        let center_x = (min_x + max_x) as f32 / 2.0;
        assert!((center_x - expected_x).abs() < 3.0, "frame {frame}: center_x was {center_x}, expected ~{expected_x}");
    }
}
