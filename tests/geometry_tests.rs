use edasym::geometry::{
    self, local_bounds, pin_far_end, pin_world_position, world_bounds, world_point,
};
use edasym::model::{
    CircleShape, Pin, PinOrientation, Primitive, Provenance, RectShape, Style, Symbol, TextAnchor,
    TextBaseline, TextShape,
};
use edasym::registry::{Instance, InstanceOptions, SymbolRegistry};
use glam::Vec2;
use std::collections::HashMap;
use std::sync::Arc;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn rect_primitive(x: f32, y: f32, width: f32, height: f32) -> Primitive {
    Primitive::Rect(RectShape {
        x,
        y,
        width,
        height,
        rx: 0.0,
        ry: 0.0,
        style: Style::default(),
    })
}

fn rect_symbol(width: f32, height: f32) -> Symbol {
    Symbol::from_parts("body", vec![rect_primitive(0.0, 0.0, width, height)], vec![])
}

fn instance(symbol: Symbol, options: InstanceOptions) -> Instance {
    Instance::new(Arc::new(symbol), options)
}

#[test]
fn adding_a_primitive_never_shrinks_the_local_box() {
    let base = rect_symbol(4.0, 2.0);
    let before = local_bounds(&base);

    let grown = Symbol::from_parts(
        "body",
        vec![
            rect_primitive(0.0, 0.0, 4.0, 2.0),
            Primitive::Circle(CircleShape {
                cx: 10.0,
                cy: 10.0,
                radius: 1.0,
                style: Style::default(),
            }),
        ],
        vec![],
    );
    let after = local_bounds(&grown);

    assert!(after.min.x <= before.min.x && after.min.y <= before.min.y);
    assert!(after.max.x >= before.max.x && after.max.y >= before.max.y);
    assert!(after.max.x >= 11.0, "the new circle must be covered");
}

#[test]
fn quarter_turns_swap_the_world_extent() {
    let make = |rotation: f32| {
        instance(
            rect_symbol(4.0, 2.0),
            InstanceOptions {
                rotation,
                ..Default::default()
            },
        )
    };

    let b0 = world_bounds(&make(0.0));
    let b90 = world_bounds(&make(90.0));
    let b180 = world_bounds(&make(180.0));
    let b270 = world_bounds(&make(270.0));

    assert!(approx(b0.width(), b90.height()), "width and height must swap");
    assert!(approx(b0.height(), b90.width()));
    assert!(approx(b0.width(), b180.width()) && approx(b0.height(), b180.height()));
    assert!(approx(b90.width(), b270.width()) && approx(b90.height(), b270.height()));
    assert!(
        !approx(b0.width(), b0.height()),
        "the fixture box must be non-square for the swap to show"
    );
}

#[test]
fn diagonal_rotation_unions_all_four_corners() {
    let inst = instance(
        rect_symbol(4.0, 2.0),
        InstanceOptions {
            rotation: 45.0,
            ..Default::default()
        },
    );
    // Padded local box is 5 x 3; at 45 degrees both extents become
    // (5 + 3) / sqrt(2).
    let expected = (5.0 + 3.0) / 2.0_f32.sqrt();
    let bounds = world_bounds(&inst);
    assert!(approx(bounds.width(), expected), "got {}", bounds.width());
    assert!(approx(bounds.height(), expected));
}

#[test]
fn explicit_path_data_beats_orientation_and_length() {
    let mut pin = Pin::new("1", "A", 0.0, 0.0);
    pin.orientation = PinOrientation::Right;
    pin.length = 5.0;
    pin.path = Some("M 0 0 h 3".to_string());

    let far = pin_far_end(&pin);
    assert!(
        approx(far.x, 3.0) && approx(far.y, 0.0),
        "path data must win, got {far:?}"
    );
}

#[test]
fn far_end_walks_the_orientation_when_no_path_exists() {
    let mut pin = Pin::new("1", "A", 1.0, 1.0);
    pin.orientation = PinOrientation::Up;
    pin.length = 2.54;
    let far = pin_far_end(&pin);
    assert!(approx(far.x, 1.0) && approx(far.y, 1.0 - 2.54));
}

#[test]
fn mirror_applies_before_rotation_and_translation() {
    let inst = instance(
        rect_symbol(1.0, 1.0),
        InstanceOptions {
            x: 10.0,
            y: 5.0,
            rotation: 90.0,
            mirror: true,
            ..Default::default()
        },
    );
    // (1, 0) mirrors to (-1, 0), rotates to (0, -1), then translates.
    let p = world_point(&inst, Vec2::new(1.0, 0.0));
    assert!(approx(p.x, 10.0) && approx(p.y, 4.0), "got {p:?}");
}

#[test]
fn pin_world_position_follows_the_instance_transform() {
    let mut symbol = rect_symbol(4.0, 2.0);
    symbol.pins.push(Pin::new("1", "A", 1.0, 0.0));

    let mut registry = SymbolRegistry::new();
    registry.register("body", symbol);
    let inst = registry
        .instantiate(
            "body",
            InstanceOptions {
                x: 10.0,
                y: 10.0,
                rotation: 90.0,
                ..Default::default()
            },
        )
        .expect("registered symbol should instantiate");

    let pin = inst.symbol.pins[0].clone();
    let p = pin_world_position(&inst, &pin);
    assert!(approx(p.x, 10.0) && approx(p.y, 11.0), "got {p:?}");
}

#[test]
fn empty_symbol_falls_back_to_its_declared_extent() {
    let symbol = Symbol {
        name: "empty".to_string(),
        width: 4.0,
        height: 2.0,
        origin_x: 0.0,
        origin_y: 0.0,
        primitives: Vec::new(),
        pins: Vec::new(),
        properties: HashMap::new(),
        provenance: Provenance::BuiltIn,
    };
    let bounds = local_bounds(&symbol);
    assert!(approx(bounds.min.x, -2.5) && approx(bounds.max.x, 2.5));
    assert!(approx(bounds.min.y, -1.5) && approx(bounds.max.y, 1.5));
}

#[test]
fn text_extent_follows_its_anchor() {
    let text = |anchor| {
        Symbol::from_parts(
            "label",
            vec![Primitive::Text(TextShape {
                x: 0.0,
                y: 0.0,
                text: "ABCD".to_string(),
                font_size: 1.0,
                anchor,
                baseline: TextBaseline::Middle,
                style: Style::default(),
            })],
            vec![],
        )
    };

    let middle = geometry::content_bounds(&text(TextAnchor::Middle).primitives, &[]).unwrap();
    assert!(approx(middle.min.x, -middle.max.x), "middle anchor centers the box");

    let start = geometry::content_bounds(&text(TextAnchor::Start).primitives, &[]).unwrap();
    assert!(approx(start.min.x, 0.0), "start anchor begins at the position");

    let end = geometry::content_bounds(&text(TextAnchor::End).primitives, &[]).unwrap();
    assert!(approx(end.max.x, 0.0), "end anchor finishes at the position");
}

#[test]
fn pins_extend_the_symbol_box_by_their_lead() {
    let mut pin = Pin::new("1", "A", 0.0, 0.0);
    pin.orientation = PinOrientation::Left;
    pin.length = 3.0;
    let symbol = Symbol::from_parts("body", vec![rect_primitive(0.0, 0.0, 2.0, 2.0)], vec![pin]);

    let bounds = local_bounds(&symbol);
    assert!(approx(bounds.min.x, -3.5), "lead plus padding, got {}", bounds.min.x);
}

#[test]
fn registry_misses_yield_none_and_rotation_wraps() {
    let mut registry = SymbolRegistry::new();
    assert!(registry.lookup("nope").is_none());
    assert!(registry.instantiate("nope", InstanceOptions::default()).is_none());

    registry.register("body", rect_symbol(1.0, 1.0));
    let mut inst = registry
        .instantiate("body", InstanceOptions::default())
        .expect("registered symbol should instantiate");
    inst.set_rotation(450.0);
    assert!(approx(inst.rotation, 90.0));
    inst.set_position(3.0, 4.0);
    inst.set_mirror(true);
    assert!(inst.mirror && approx(inst.x, 3.0));
}
