//! Bounding boxes, pin endpoints, and instance transforms over the
//! canonical model.
//!
//! Text extents are heuristic (character count times font size, no real
//! glyph metrics) and must not be treated as a precision guarantee.

use crate::model::{Pin, PinOrientation, Primitive, Symbol, TextAnchor, TextBaseline, TextShape};
use crate::registry::Instance;
use glam::{Mat2, Vec2};
use regex::Regex;
use std::sync::OnceLock;

/// Estimated glyph advance as a fraction of the font size.
const TEXT_WIDTH_FACTOR: f32 = 0.6;
/// Estimated line height as a fraction of the font size.
const TEXT_HEIGHT_FACTOR: f32 = 1.2;
/// Padding added on all sides of a local bounding box, for hit-testing and
/// highlight rendering in the presentation layer.
const BOUNDS_MARGIN: f32 = 0.5;

/// An axis-aligned box in either the symbol frame or the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn of_point(p: Vec2) -> Self {
        Bounds { min: p, max: p }
    }

    pub fn include(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(mut self, other: Bounds) -> Self {
        self.include(other.min);
        self.include(other.max);
        self
    }

    pub fn expand(mut self, margin: f32) -> Self {
        self.min -= Vec2::splat(margin);
        self.max += Vec2::splat(margin);
        self
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

fn accumulate(acc: &mut Option<Bounds>, b: Bounds) {
    *acc = Some(match acc.take() {
        Some(existing) => existing.union(b),
        None => b,
    });
}

/// Union box of a primitive/pin set, with no padding and no fallback.
/// `None` when nothing contributes a finite bound.
pub fn content_bounds(primitives: &[Primitive], pins: &[Pin]) -> Option<Bounds> {
    let mut acc = None;
    for primitive in primitives {
        if let Some(b) = primitive_bounds(primitive) {
            accumulate(&mut acc, b);
        }
    }
    for pin in pins {
        accumulate(&mut acc, pin_bounds(pin));
    }
    acc
}

/// Local bounding box of a symbol, padded on all sides. Falls back to a
/// symmetric box of the declared width/height around the declared origin
/// when no primitive or pin yields a finite bound.
pub fn local_bounds(symbol: &Symbol) -> Bounds {
    let content = content_bounds(&symbol.primitives, &symbol.pins).unwrap_or_else(|| {
        let origin = Vec2::new(symbol.origin_x, symbol.origin_y);
        let half = Vec2::new(symbol.width, symbol.height) / 2.0;
        Bounds {
            min: origin - half,
            max: origin + half,
        }
    });
    content.expand(BOUNDS_MARGIN)
}

/// Per-type bounds rules. Raw path primitives are not decomposed and
/// contribute nothing.
pub fn primitive_bounds(primitive: &Primitive) -> Option<Bounds> {
    match primitive {
        Primitive::Line(line) => {
            let mut b = Bounds::of_point(Vec2::new(line.x1, line.y1));
            b.include(Vec2::new(line.x2, line.y2));
            Some(b)
        }
        Primitive::Rect(rect) => {
            let mut b = Bounds::of_point(Vec2::new(rect.x, rect.y));
            b.include(Vec2::new(rect.x + rect.width, rect.y + rect.height));
            Some(b)
        }
        Primitive::Circle(circle) => {
            let center = Vec2::new(circle.cx, circle.cy);
            Some(Bounds {
                min: center - Vec2::splat(circle.radius),
                max: center + Vec2::splat(circle.radius),
            })
        }
        Primitive::Arc(arc) => {
            let center = Vec2::new(arc.cx, arc.cy);
            Some(Bounds {
                min: center - Vec2::splat(arc.radius),
                max: center + Vec2::splat(arc.radius),
            })
        }
        Primitive::Polyline(poly) => points_bounds(&poly.points),
        Primitive::Polygon(poly) => points_bounds(&poly.points),
        Primitive::Path(_) => None,
        Primitive::Text(text) => Some(text_bounds(text)),
    }
}

fn points_bounds(points: &[(f32, f32)]) -> Option<Bounds> {
    let mut acc = None;
    for &(x, y) in points {
        accumulate(&mut acc, Bounds::of_point(Vec2::new(x, y)));
    }
    acc
}

/// Heuristic text box: character count times font size, anchored by the
/// text's horizontal anchor and vertical baseline.
fn text_bounds(text: &TextShape) -> Bounds {
    let width = text.text.chars().count() as f32 * text.font_size * TEXT_WIDTH_FACTOR;
    let height = text.font_size * TEXT_HEIGHT_FACTOR;

    let (min_x, max_x) = match text.anchor {
        TextAnchor::Start => (text.x, text.x + width),
        TextAnchor::Middle => (text.x - width / 2.0, text.x + width / 2.0),
        TextAnchor::End => (text.x - width, text.x),
    };
    let (min_y, max_y) = match text.baseline {
        TextBaseline::Middle => (text.y - height / 2.0, text.y + height / 2.0),
        TextBaseline::Top => (text.y, text.y + height),
        TextBaseline::Bottom => (text.y - height, text.y),
    };

    Bounds {
        min: Vec2::new(min_x, min_y),
        max: Vec2::new(max_x, max_y),
    }
}

/// A pin contributes its connection point and its far (body-facing) end.
pub fn pin_bounds(pin: &Pin) -> Bounds {
    let mut b = Bounds::of_point(Vec2::new(pin.x, pin.y));
    b.include(pin_far_end(pin));
    b
}

/// Far end of the pin's lead line. Explicit path data wins over
/// orientation+length; an unparsable path falls back to the walk.
pub fn pin_far_end(pin: &Pin) -> Vec2 {
    if let Some(data) = &pin.path {
        if let Some(lead) = parse_pin_path(data) {
            return lead.end();
        }
        log::debug!("unparsable pin path {:?}, using orientation walk", data);
    }

    let connection = Vec2::new(pin.x, pin.y);
    connection + orientation_vector(pin.orientation) * pin.length
}

pub fn orientation_vector(orientation: PinOrientation) -> Vec2 {
    match orientation {
        PinOrientation::Left => Vec2::new(-1.0, 0.0),
        PinOrientation::Right => Vec2::new(1.0, 0.0),
        PinOrientation::Up => Vec2::new(0.0, -1.0),
        PinOrientation::Down => Vec2::new(0.0, 1.0),
    }
}

/// A parsed pin lead line: a leading `M x y` followed by a single
/// `h`, `v`, or `L` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PathLead {
    Horizontal { start: Vec2, dx: f32 },
    Vertical { start: Vec2, dy: f32 },
    LineTo { start: Vec2, end: Vec2 },
}

impl PathLead {
    pub(crate) fn start(&self) -> Vec2 {
        match *self {
            PathLead::Horizontal { start, .. }
            | PathLead::Vertical { start, .. }
            | PathLead::LineTo { start, .. } => start,
        }
    }

    pub(crate) fn end(&self) -> Vec2 {
        match *self {
            PathLead::Horizontal { start, dx } => start + Vec2::new(dx, 0.0),
            PathLead::Vertical { start, dy } => start + Vec2::new(0.0, dy),
            PathLead::LineTo { end, .. } => end,
        }
    }
}

fn path_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z]|-?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?")
            .expect("valid path token pattern")
    })
}

pub(crate) fn parse_pin_path(data: &str) -> Option<PathLead> {
    let tokens: Vec<&str> = path_token_pattern()
        .find_iter(data)
        .map(|m| m.as_str())
        .collect();

    if !matches!(tokens.first(), Some(&"M") | Some(&"m")) {
        return None;
    }
    let start = Vec2::new(tokens.get(1)?.parse().ok()?, tokens.get(2)?.parse().ok()?);

    match *tokens.get(3)? {
        "h" => Some(PathLead::Horizontal {
            start,
            dx: tokens.get(4)?.parse().ok()?,
        }),
        "H" => Some(PathLead::Horizontal {
            start,
            dx: tokens.get(4)?.parse::<f32>().ok()? - start.x,
        }),
        "v" => Some(PathLead::Vertical {
            start,
            dy: tokens.get(4)?.parse().ok()?,
        }),
        "V" => Some(PathLead::Vertical {
            start,
            dy: tokens.get(4)?.parse::<f32>().ok()? - start.y,
        }),
        "L" => Some(PathLead::LineTo {
            start,
            end: Vec2::new(tokens.get(4)?.parse().ok()?, tokens.get(5)?.parse().ok()?),
        }),
        "l" => {
            let delta = Vec2::new(tokens.get(4)?.parse().ok()?, tokens.get(5)?.parse().ok()?);
            Some(PathLead::LineTo {
                start,
                end: start + delta,
            })
        }
        _ => None,
    }
}

/// Mirror across the local X axis, rotate, then translate into the world
/// frame.
pub fn world_point(instance: &Instance, local: Vec2) -> Vec2 {
    let mut p = local;
    if instance.mirror {
        p.x = -p.x;
    }
    let rotation = Mat2::from_angle(instance.rotation.to_radians());
    rotation * p + Vec2::new(instance.x, instance.y)
}

/// World bounding box: all four corners of the local box are transformed
/// and unioned, since rotation can make any corner extremal.
pub fn world_bounds(instance: &Instance) -> Bounds {
    let local = local_bounds(&instance.symbol);
    let corners = local.corners();

    let mut b = Bounds::of_point(world_point(instance, corners[0]));
    for corner in &corners[1..] {
        b.include(world_point(instance, *corner));
    }
    b
}

/// World position of a pin's connection point.
pub fn pin_world_position(instance: &Instance, pin: &Pin) -> Vec2 {
    world_point(instance, Vec2::new(pin.x, pin.y))
}

// --- Frame normalization shared by the converters ---

pub(crate) fn map_coord(x: f32, y: f32, offset: Vec2, scale: f32) -> (f32, f32) {
    ((x - offset.x) * scale, (y - offset.y) * scale)
}

fn scale_stroke(style: &mut crate::model::Style, scale: f32) {
    if let Some(width) = &mut style.stroke_width {
        *width *= scale;
    }
}

/// Translates a primitive so `offset` becomes the origin, then scales it.
/// Opaque path data is not rewritten; it receives a render-time transform
/// instead.
pub(crate) fn offset_scale_primitive(primitive: &mut Primitive, offset: Vec2, scale: f32) {
    use crate::model::PathTransform;

    match primitive {
        Primitive::Line(line) => {
            (line.x1, line.y1) = map_coord(line.x1, line.y1, offset, scale);
            (line.x2, line.y2) = map_coord(line.x2, line.y2, offset, scale);
            scale_stroke(&mut line.style, scale);
        }
        Primitive::Rect(rect) => {
            (rect.x, rect.y) = map_coord(rect.x, rect.y, offset, scale);
            rect.width *= scale;
            rect.height *= scale;
            rect.rx *= scale;
            rect.ry *= scale;
            scale_stroke(&mut rect.style, scale);
        }
        Primitive::Circle(circle) => {
            (circle.cx, circle.cy) = map_coord(circle.cx, circle.cy, offset, scale);
            circle.radius *= scale;
            scale_stroke(&mut circle.style, scale);
        }
        Primitive::Arc(arc) => {
            (arc.cx, arc.cy) = map_coord(arc.cx, arc.cy, offset, scale);
            arc.radius *= scale;
            scale_stroke(&mut arc.style, scale);
        }
        Primitive::Polyline(poly) => {
            for point in &mut poly.points {
                *point = map_coord(point.0, point.1, offset, scale);
            }
            scale_stroke(&mut poly.style, scale);
        }
        Primitive::Polygon(poly) => {
            for point in &mut poly.points {
                *point = map_coord(point.0, point.1, offset, scale);
            }
            scale_stroke(&mut poly.style, scale);
        }
        Primitive::Path(path) => {
            path.transform = Some(PathTransform {
                dx: -offset.x,
                dy: -offset.y,
                scale,
            });
            scale_stroke(&mut path.style, scale);
        }
        Primitive::Text(text) => {
            (text.x, text.y) = map_coord(text.x, text.y, offset, scale);
            text.font_size *= scale;
            scale_stroke(&mut text.style, scale);
        }
    }
}

/// Translates and scales a pin, its labels, and its lead-line path. The
/// path fragment is re-emitted in the new frame so path precedence keeps
/// holding after normalization.
pub(crate) fn offset_scale_pin(pin: &mut Pin, offset: Vec2, scale: f32) {
    (pin.x, pin.y) = map_coord(pin.x, pin.y, offset, scale);
    pin.length *= scale;

    for label in [&mut pin.name_label, &mut pin.number_label]
        .into_iter()
        .flatten()
    {
        (label.x, label.y) = map_coord(label.x, label.y, offset, scale);
        label.font_size *= scale;
    }

    if let Some(data) = pin.path.take() {
        pin.path = parse_pin_path(&data).map(|lead| rewrite_lead(lead, offset, scale));
        if pin.path.is_none() {
            log::warn!("dropping unparsable pin path {:?}", data);
        }
    }
}

fn rewrite_lead(lead: PathLead, offset: Vec2, scale: f32) -> String {
    let start = (lead.start() - offset) * scale;
    match lead {
        PathLead::Horizontal { dx, .. } => format!("M {} {} h {}", start.x, start.y, dx * scale),
        PathLead::Vertical { dy, .. } => format!("M {} {} v {}", start.x, start.y, dy * scale),
        PathLead::LineTo { end, .. } => {
            let end = (end - offset) * scale;
            format!("M {} {} L {} {}", start.x, start.y, end.x, end.y)
        }
    }
}
