use edasym::easyeda::{EeShapeRecord, convert_symbol};
use edasym::geometry;
use edasym::model::{
    PinOrientation, Primitive, Provenance, REF_PLACEHOLDER, VALUE_PLACEHOLDER,
};
use serde_json::json;

const SCALE: f32 = 0.254;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn record(shapes: &[&str]) -> EeShapeRecord {
    EeShapeRecord {
        shape: shapes.iter().map(|s| s.to_string()).collect(),
        bbox: None,
    }
}

#[test]
fn line_and_pin_convert_to_scaled_symbol() {
    let record = record(&["L~0~0~10~0~#880000~1", "P~0~0~1~~0~0"]);
    let symbol = convert_symbol(&record).expect("line+pin record should convert");

    assert!(
        approx(symbol.width, 10.0 * SCALE),
        "width should be the scaled span of the line, got {}",
        symbol.width
    );
    assert_eq!(symbol.pins.len(), 1, "expected exactly one pin");
    let pin = &symbol.pins[0];
    assert_eq!(pin.number, "1");
    assert!(approx(pin.x, 0.0) && approx(pin.y, 0.0), "pin should sit at the scaled, offset coordinate");
    assert_eq!(symbol.provenance, Provenance::EasyEda);

    let Primitive::Line(line) = &symbol.primitives[0] else {
        panic!("first primitive should be the line");
    };
    assert!(approx(line.x2, 10.0 * SCALE));
    assert_eq!(line.style.stroke.as_deref(), Some("#880000"));
}

#[test]
fn coordinates_round_trip_through_offset_and_scale() {
    let record = record(&["R~5~5~20~10~#880000~1", "C~30~10~5~#880000~1"]);
    let symbol = convert_symbol(&record).expect("record should convert");

    // Union box minimum is (5, 5): every coordinate must equal
    // (v - offset) * 0.254.
    let Primitive::Rect(rect) = &symbol.primitives[0] else {
        panic!("expected a rectangle");
    };
    assert!(approx(rect.x, (5.0 - 5.0) * SCALE));
    assert!(approx(rect.width, 20.0 * SCALE));
    assert!(approx(rect.style.stroke_width.unwrap(), 1.0 * SCALE));

    let Primitive::Circle(circle) = &symbol.primitives[1] else {
        panic!("expected a circle");
    };
    assert!(approx(circle.cx, (30.0 - 5.0) * SCALE));
    assert!(approx(circle.cy, (10.0 - 5.0) * SCALE));
    assert!(approx(circle.radius, 5.0 * SCALE));

    assert!(approx(symbol.width, 30.0 * SCALE), "union spans x 5..35");
    assert!(approx(symbol.height, 10.0 * SCALE), "union spans y 5..15");
}

#[test]
fn record_bounding_box_supplies_the_offset() {
    let record = EeShapeRecord {
        shape: vec!["L~0~0~10~0~#000000~1".to_string()],
        bbox: serde_json::from_value(json!({"x": -10.0, "y": -10.0, "width": 40.0, "height": 40.0}))
            .ok(),
    };
    let symbol = convert_symbol(&record).expect("record should convert");

    let Primitive::Line(line) = &symbol.primitives[0] else {
        panic!("expected a line");
    };
    assert!(approx(line.x1, 10.0 * SCALE), "offset comes from the record box");
    assert!(approx(line.y1, 10.0 * SCALE));
}

#[test]
fn pin_lead_comes_from_the_path_fragment() {
    let shape = "P~1~0~1~390~290~0^^1~392~290~0~CLK~start~~7pt^^M390,290h-20~#880000";
    let symbol = convert_symbol(&record(&[shape])).expect("pin should convert");

    let pin = &symbol.pins[0];
    assert_eq!(pin.name, "CLK");
    assert_eq!(
        pin.orientation,
        PinOrientation::Left,
        "negative h delta means a leftward lead"
    );
    assert!(approx(pin.length, 20.0 * SCALE));
    assert!(approx(pin.x, 20.0 * SCALE), "connection offsets against the lead end");

    // The rewritten fragment still wins over orientation+length and lands
    // on the normalized origin.
    let far = geometry::pin_far_end(pin);
    assert!(approx(far.x, 0.0) && approx(far.y, 0.0), "far end should be {far:?}");

    let label = pin.name_label.as_ref().expect("explicit label position kept");
    assert!(approx(label.x, (392.0 - 370.0) * SCALE));
    assert!(approx(label.font_size, 7.0 * SCALE));
}

#[test]
fn vertical_path_fragment_means_a_vertical_pin() {
    let shape = "P~1~0~2~100~100~90^^^^M100,100v15~#000000";
    let symbol = convert_symbol(&record(&[shape])).expect("pin should convert");

    let pin = &symbol.pins[0];
    assert_eq!(pin.orientation, PinOrientation::Down);
    assert!(approx(pin.length, 15.0 * SCALE));
}

#[test]
fn header_rotation_maps_orientation_when_no_path_exists() {
    for (angle, orientation) in [
        ("0", PinOrientation::Left),
        ("90", PinOrientation::Down),
        ("180", PinOrientation::Right),
        ("270", PinOrientation::Up),
    ] {
        let shape = format!("P~1~0~1~0~0~{angle}");
        let symbol = convert_symbol(&record(&[&shape])).expect("pin should convert");
        assert_eq!(
            symbol.pins[0].orientation, orientation,
            "rotation {angle} maps to {orientation:?}"
        );
    }
}

#[test]
fn ellipse_is_approximated_by_the_larger_radius() {
    let symbol = convert_symbol(&record(&["E~10~10~8~5~#000000~1"])).expect("ellipse converts");
    let Primitive::Circle(circle) = &symbol.primitives[0] else {
        panic!("ellipse should come out as a circle");
    };
    assert!(approx(circle.radius, 8.0 * SCALE));
}

#[test]
fn six_field_rectangle_carries_corner_radii() {
    let symbol =
        convert_symbol(&record(&["R~0~0~2~2~20~10~#000000~1~0~none~gge1"])).expect("rect converts");
    let Primitive::Rect(rect) = &symbol.primitives[0] else {
        panic!("expected a rectangle");
    };
    assert!(approx(rect.rx, 2.0 * SCALE));
    assert!(approx(rect.width, 20.0 * SCALE));
    assert!(approx(rect.height, 10.0 * SCALE));
}

#[test]
fn second_label_text_becomes_the_number_when_numeric() {
    let shape = "P~1~0~1~0~0~0^^1~5~0~0~SDA~start~~7pt^^1~5~5~0~7~start~~7pt";
    let symbol = convert_symbol(&record(&[shape])).expect("pin converts");
    let pin = &symbol.pins[0];
    assert_eq!(pin.name, "SDA");
    assert_eq!(pin.number, "7", "purely numeric second label overrides the header number");
    assert!(pin.number_label.is_some());
}

#[test]
fn placeholder_texts_are_appended() {
    let symbol = convert_symbol(&record(&["L~0~0~10~0~#000000~1"])).expect("line converts");
    let texts: Vec<&str> = symbol
        .primitives
        .iter()
        .filter_map(|p| match p {
            Primitive::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec![REF_PLACEHOLDER, VALUE_PLACEHOLDER]);
}

#[test]
fn contentless_record_without_bbox_fails() {
    assert!(convert_symbol(&record(&[])).is_err(), "nothing to convert");
    assert!(
        convert_symbol(&record(&["R~x~y", "??"])).is_err(),
        "malformed-only shapes leave no geometry"
    );
}

#[test]
fn malformed_entries_are_skipped_individually() {
    let symbol = convert_symbol(&record(&["R~x~y~z~w", "L~0~0~10~0~#000000~1"]))
        .expect("good entry should survive the bad one");
    // One line plus the two placeholders.
    assert_eq!(symbol.primitives.len(), 3);
}

#[test]
fn record_deserializes_from_json_value() {
    let data = json!({
        "shape": ["L~0~0~10~0~#000000~1"],
        "BBox": {"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0}
    });
    let record = EeShapeRecord::from_value(&data).expect("record should deserialize");
    assert_eq!(record.shape.len(), 1);
    assert!(record.bbox.is_some(), "BBox alias should be accepted");
}
