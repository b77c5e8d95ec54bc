//! EasyEDA shape-string converter.
//!
//! Parses the tilde-delimited shape entries of an EasyEDA symbol record
//! into canonical primitives and pins, then normalizes: offset to the
//! bounding-box minimum corner and scale from 1/100 mil source units to
//! millimeters.

use crate::error::{Error, Result};
use crate::geometry::{self, PathLead};
use crate::model::{
    CircleShape, LineShape, PathShape, Pin, PinKind, PinLabel,
    PinOrientation, PolygonShape, PolylineShape, Primitive, Provenance, RectShape, Style, Symbol,
    TextAnchor, placeholder_texts,
};
use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;

/// Source units are 1/100 mil; one canonical unit is a millimeter.
const EE_UNIT_TO_MM: f32 = 0.254;

/// Lead length in source units when a pin's path fragment cannot be
/// parsed. Pins with no fragment at all get a zero-length lead.
const FALLBACK_PIN_LENGTH: f32 = 10.0;

/// An EasyEDA symbol record: the shape-string array plus the record's own
/// bounding box when the source supplies one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EeShapeRecord {
    #[serde(default)]
    pub shape: Vec<String>,
    #[serde(default, alias = "BBox")]
    pub bbox: Option<EeBoundingBox>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EeBoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl EeBoundingBox {
    fn is_well_formed(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl EeShapeRecord {
    /// Reads a record out of an already-retrieved JSON value.
    pub fn from_value(data: &serde_json::Value) -> Result<Self> {
        EeShapeRecord::deserialize(data).map_err(Error::from)
    }
}

/// Converts a shape record into a canonical symbol. Malformed shape
/// entries are skipped individually; conversion fails only when nothing
/// was produced and the record box is unusable.
pub fn convert_symbol(record: &EeShapeRecord) -> Result<Symbol> {
    let mut primitives = Vec::new();
    let mut pins = Vec::new();

    for shape in &record.shape {
        if shape.starts_with("P~") {
            match parse_pin(shape) {
                Some(pin) => pins.push(pin),
                None => log::warn!("skipping malformed pin shape {:?}", shape),
            }
            continue;
        }

        let fields: Vec<&str> = shape.split('~').collect();
        let parsed = match fields[0] {
            "PL" => parse_polyline(&fields),
            "PG" => parse_polygon(&fields),
            "L" => parse_line(&fields),
            "R" => parse_rect(&fields),
            "C" => parse_circle(&fields),
            "E" => parse_ellipse(&fields),
            "PT" => parse_path(&fields),
            other => {
                log::trace!("ignoring unsupported shape code {:?}", other);
                continue;
            }
        };
        match parsed {
            Some(primitive) => primitives.push(primitive),
            None => log::warn!("skipping malformed shape {:?}", shape),
        }
    }

    let record_bbox = record.bbox.filter(EeBoundingBox::is_well_formed);
    let content = geometry::content_bounds(&primitives, &pins);

    let offset = match (record_bbox, &content) {
        (Some(b), _) => Vec2::new(b.x, b.y),
        (None, Some(c)) => c.min,
        (None, None) => {
            return Err(Error::MissingData(
                "shape record produced no geometry and has no usable bounding box".to_string(),
            ));
        }
    };

    for primitive in &mut primitives {
        geometry::offset_scale_primitive(primitive, offset, EE_UNIT_TO_MM);
    }
    for pin in &mut pins {
        geometry::offset_scale_pin(pin, offset, EE_UNIT_TO_MM);
    }

    // Extent of the normalized content union; a contentless record falls
    // back to its own scaled box.
    let (width, height) = match geometry::content_bounds(&primitives, &pins) {
        Some(b) => (b.width(), b.height()),
        None => match record_bbox {
            Some(b) => (b.width * EE_UNIT_TO_MM, b.height * EE_UNIT_TO_MM),
            None => (0.0, 0.0),
        },
    };

    let (reference, value) = placeholder_texts(width);
    primitives.push(reference);
    primitives.push(value);

    Ok(Symbol {
        name: String::new(),
        width,
        height,
        origin_x: 0.0,
        origin_y: 0.0,
        primitives,
        pins,
        properties: HashMap::new(),
        provenance: Provenance::EasyEda,
    })
}

fn num(fields: &[&str], index: usize) -> Option<f32> {
    fields.get(index)?.trim().parse().ok()
}

fn text<'a>(fields: &'a [&str], index: usize) -> Option<&'a str> {
    let value = fields.get(index)?.trim();
    if value.is_empty() { None } else { Some(value) }
}

fn style(fields: &[&str], stroke: usize, width: usize, fill: Option<usize>) -> Style {
    Style {
        stroke: text(fields, stroke).map(String::from),
        stroke_width: num(fields, width),
        fill: fill.and_then(|i| text(fields, i)).map(String::from),
    }
}

fn parse_point_list(data: &str) -> Vec<(f32, f32)> {
    let numbers: Vec<f32> = data
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|token| token.parse().ok())
        .collect();
    numbers.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect()
}

fn parse_polyline(fields: &[&str]) -> Option<Primitive> {
    let points = parse_point_list(text(fields, 1)?);
    if points.is_empty() {
        return None;
    }
    Some(Primitive::Polyline(PolylineShape {
        points,
        style: style(fields, 2, 3, None),
    }))
}

fn parse_polygon(fields: &[&str]) -> Option<Primitive> {
    let points = parse_point_list(text(fields, 1)?);
    if points.is_empty() {
        return None;
    }
    Some(Primitive::Polygon(PolygonShape {
        points,
        style: style(fields, 2, 3, Some(5)),
    }))
}

fn parse_line(fields: &[&str]) -> Option<Primitive> {
    Some(Primitive::Line(LineShape {
        x1: num(fields, 1)?,
        y1: num(fields, 2)?,
        x2: num(fields, 3)?,
        y2: num(fields, 4)?,
        style: style(fields, 5, 6, None),
    }))
}

/// Rectangles come in a 4-field legacy layout (x, y, width, height) and a
/// 6-field rounded layout (x, y, rx, ry, width, height). Six numeric
/// fields mean the rounded layout; empty radius fields count as zero.
fn parse_rect(fields: &[&str]) -> Option<Primitive> {
    let x = num(fields, 1)?;
    let y = num(fields, 2)?;

    if let (Some(width), Some(height)) = (num(fields, 5), num(fields, 6)) {
        return Some(Primitive::Rect(RectShape {
            x,
            y,
            width,
            height,
            rx: num(fields, 3).unwrap_or(0.0),
            ry: num(fields, 4).unwrap_or(0.0),
            style: style(fields, 7, 8, Some(10)),
        }));
    }

    Some(Primitive::Rect(RectShape {
        x,
        y,
        width: num(fields, 3)?,
        height: num(fields, 4)?,
        rx: 0.0,
        ry: 0.0,
        style: style(fields, 5, 6, None),
    }))
}

fn parse_circle(fields: &[&str]) -> Option<Primitive> {
    Some(Primitive::Circle(CircleShape {
        cx: num(fields, 1)?,
        cy: num(fields, 2)?,
        radius: num(fields, 3)?,
        style: style(fields, 4, 5, Some(7)),
    }))
}

/// Ellipses are approximated as a circle of the larger radius. Lossy.
fn parse_ellipse(fields: &[&str]) -> Option<Primitive> {
    let rx = num(fields, 3)?;
    let ry = num(fields, 4)?;
    Some(Primitive::Circle(CircleShape {
        cx: num(fields, 1)?,
        cy: num(fields, 2)?,
        radius: rx.max(ry),
        style: style(fields, 5, 6, Some(8)),
    }))
}

fn parse_path(fields: &[&str]) -> Option<Primitive> {
    Some(Primitive::Path(PathShape {
        data: text(fields, 1)?.to_string(),
        transform: None,
        style: style(fields, 2, 3, Some(5)),
    }))
}

// --- Pins ---

/// Pin shapes are two-tier: a `~`-field header (display flag, electric
/// type, number, x, y, rotation), then `^^`-separated label segments, one
/// of which usually carries the lead-line path fragment.
fn parse_pin(shape: &str) -> Option<Pin> {
    let segments: Vec<&str> = shape.split("^^").collect();
    let header: Vec<&str> = segments[0].split('~').collect();

    let mut pin = Pin::new(
        text(&header, 3).unwrap_or(""),
        "",
        num(&header, 4).unwrap_or(0.0),
        num(&header, 5).unwrap_or(0.0),
    );
    pin.kind = map_pin_kind(header.get(2).copied().unwrap_or(""));
    let rotation = num(&header, 6).unwrap_or(0.0);

    let mut path_fragment = None;
    let mut labels = Vec::new();
    for segment in &segments[1..] {
        let fields: Vec<&str> = segment.split('~').collect();
        if let Some(fragment) = fields.iter().find(|f| looks_like_path(f)) {
            path_fragment.get_or_insert_with(|| fragment.trim().to_string());
            continue;
        }
        if let Some(label_text) = text(&fields, 4) {
            labels.push((label_text.to_string(), parse_label(&fields)));
        }
    }

    if let Some((name, label)) = labels.first() {
        pin.name = name.clone();
        pin.name_label = label.clone();
    }
    if let Some((number, label)) = labels.get(1) {
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            pin.number = number.clone();
        }
        pin.number_label = label.clone();
    }

    resolve_lead(&mut pin, path_fragment, rotation);
    Some(pin)
}

fn looks_like_path(field: &str) -> bool {
    let trimmed = field.trim();
    let mut chars = trimmed.chars();
    if !matches!(chars.next(), Some('M') | Some('m')) {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_whitespace() || c.is_ascii_digit() || c == '-' || c == ',')
}

/// Label segment layout: visible, x, y, rotation, text, anchor, font
/// family, font size.
fn parse_label(fields: &[&str]) -> Option<PinLabel> {
    let x = num(fields, 1)?;
    let y = num(fields, 2)?;
    let font_size = fields
        .get(7)
        .map(|f| f.trim_end_matches(|c: char| c.is_alphabetic()))
        .and_then(|f| f.parse().ok())
        .unwrap_or(7.0);
    Some(PinLabel {
        x,
        y,
        anchor: parse_anchor(fields.get(5).copied().unwrap_or("")),
        rotation: num(fields, 3).unwrap_or(0.0),
        font_size,
    })
}

fn parse_anchor(value: &str) -> TextAnchor {
    match value.trim() {
        "middle" => TextAnchor::Middle,
        "end" => TextAnchor::End,
        _ => TextAnchor::Start,
    }
}

/// Orientation and length come from the path fragment when one parses;
/// only then does the header rotation table apply. The two sources
/// disagree on angle conventions, so the order matters.
fn resolve_lead(pin: &mut Pin, path_fragment: Option<String>, rotation: f32) {
    pin.orientation = orientation_from_rotation(rotation);

    if let Some(fragment) = path_fragment {
        if let Some(lead) = geometry::parse_pin_path(&fragment) {
            let (orientation, length) = lead_orientation(&lead);
            pin.orientation = orientation;
            pin.length = length;
            pin.path = Some(fragment);
        } else {
            log::warn!("unparsable pin path fragment {:?}", fragment);
            pin.length = FALLBACK_PIN_LENGTH;
        }
    }
}

fn lead_orientation(lead: &PathLead) -> (PinOrientation, f32) {
    match *lead {
        PathLead::Horizontal { dx, .. } => {
            let orientation = if dx < 0.0 {
                PinOrientation::Left
            } else {
                PinOrientation::Right
            };
            (orientation, dx.abs())
        }
        PathLead::Vertical { dy, .. } => {
            let orientation = if dy < 0.0 {
                PinOrientation::Up
            } else {
                PinOrientation::Down
            };
            (orientation, dy.abs())
        }
        PathLead::LineTo { start, end } => {
            let delta = end - start;
            let orientation = if delta.x.abs() >= delta.y.abs() {
                if delta.x < 0.0 {
                    PinOrientation::Left
                } else {
                    PinOrientation::Right
                }
            } else if delta.y < 0.0 {
                PinOrientation::Up
            } else {
                PinOrientation::Down
            };
            (orientation, delta.length())
        }
    }
}

/// EasyEDA rotation angles point the opposite way from KiCad's: 0 is a
/// leftward lead here.
fn orientation_from_rotation(angle: f32) -> PinOrientation {
    match angle.rem_euclid(360.0).round() as i32 {
        0 => PinOrientation::Left,
        90 => PinOrientation::Down,
        180 => PinOrientation::Right,
        270 => PinOrientation::Up,
        other => {
            log::debug!("unexpected pin rotation {other}, defaulting to left");
            PinOrientation::Left
        }
    }
}

fn map_pin_kind(code: &str) -> PinKind {
    match code.trim() {
        "1" => PinKind::Input,
        "2" => PinKind::Output,
        "3" => PinKind::Bidirectional,
        "4" => PinKind::PowerIn,
        _ => PinKind::Passive,
    }
}
