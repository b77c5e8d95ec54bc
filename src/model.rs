//! The canonical symbol model every converter targets and all geometry
//! operations consume.
//!
//! A [`Symbol`] is immutable once built and may be shared by any number of
//! component instances. Primitives and pins are owned exclusively by their
//! symbol and all share one coordinate frame (Y grows downward).

use std::collections::HashMap;

/// Placeholder token substituted with the reference designator at draw time.
pub const REF_PLACEHOLDER: &str = "${REF}";
/// Placeholder token substituted with the value at draw time.
pub const VALUE_PLACEHOLDER: &str = "${VALUE}";

/// Theme-neutral stroke marker; presentation layers resolve it to the
/// active theme's outline color.
pub const THEME_STROKE: &str = "currentColor";
/// Fixed light fill used for KiCad `background`-filled bodies.
pub const BACKGROUND_FILL: &str = "#ffffc2";

/// Which converter produced a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    BuiltIn,
    EasyEda,
    KiCad,
}

/// Advisory styling shared by all primitives. Never consulted by geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub fill: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineShape {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectShape {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Corner radii, zero for sharp corners. Advisory, like styling.
    pub rx: f32,
    pub ry: f32,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircleShape {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcShape {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    /// Angles in degrees, measured in the symbol frame.
    pub start_angle: f32,
    pub end_angle: f32,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineShape {
    pub points: Vec<(f32, f32)>,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    pub points: Vec<(f32, f32)>,
    pub style: Style,
}

/// Render-time transform for opaque path data: `p -> (p + (dx, dy)) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathTransform {
    pub dx: f32,
    pub dy: f32,
    pub scale: f32,
}

/// Raw path data passed through from the source format, not geometrically
/// decomposed. Contributes nothing to bounding boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct PathShape {
    pub data: String,
    pub transform: Option<PathTransform>,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Middle,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
    pub style: Style,
}

/// One drawable shape within a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line(LineShape),
    Rect(RectShape),
    Circle(CircleShape),
    Arc(ArcShape),
    Polyline(PolylineShape),
    Polygon(PolygonShape),
    Path(PathShape),
    Text(TextShape),
}

/// Direction the pin's lead line extends away from the connection point;
/// the body lies on the opposite side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOrientation {
    Left,
    Right,
    Up,
    Down,
}

/// Logical pin kind. Advisory, not enforced by geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Passive,
    Input,
    Output,
    Bidirectional,
    PowerIn,
    PowerOut,
}

/// Explicit placement for a pin's name or number label.
#[derive(Debug, Clone, PartialEq)]
pub struct PinLabel {
    pub x: f32,
    pub y: f32,
    pub anchor: TextAnchor,
    pub rotation: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// Pin number; need not be numeric.
    pub number: String,
    /// Pin name; may be empty.
    pub name: String,
    /// Connection point in the symbol frame. Wires attach here.
    pub x: f32,
    pub y: f32,
    pub orientation: PinOrientation,
    pub length: f32,
    /// Explicit lead-line path data. Takes precedence over
    /// orientation+length when present.
    pub path: Option<String>,
    pub name_label: Option<PinLabel>,
    pub number_label: Option<PinLabel>,
    pub kind: PinKind,
}

impl Pin {
    pub fn new(number: impl Into<String>, name: impl Into<String>, x: f32, y: f32) -> Self {
        Pin {
            number: number.into(),
            name: name.into(),
            x,
            y,
            orientation: PinOrientation::Left,
            length: 0.0,
            path: None,
            name_label: None,
            number_label: None,
            kind: PinKind::Passive,
        }
    }
}

/// The unified, format-agnostic representation of a component's drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    /// Extent of the primitive+pin union after normalization. Non-negative.
    pub width: f32,
    pub height: f32,
    /// Reference offset of the shared coordinate frame.
    pub origin_x: f32,
    pub origin_y: f32,
    pub primitives: Vec<Primitive>,
    pub pins: Vec<Pin>,
    pub properties: HashMap<String, String>,
    pub provenance: Provenance,
}

impl Symbol {
    /// Builds a symbol directly from canonical primitives and pins (the
    /// built-in source). Width and height are measured from the content
    /// union; an empty symbol gets a zero extent.
    pub fn from_parts(name: impl Into<String>, primitives: Vec<Primitive>, pins: Vec<Pin>) -> Self {
        let bounds = crate::geometry::content_bounds(&primitives, &pins);
        let (width, height) = match bounds {
            Some(b) => (b.width(), b.height()),
            None => (0.0, 0.0),
        };
        Symbol {
            name: name.into(),
            width,
            height,
            origin_x: 0.0,
            origin_y: 0.0,
            primitives,
            pins,
            properties: HashMap::new(),
            provenance: Provenance::BuiltIn,
        }
    }
}

/// The two placeholder texts appended after normalization, placed just
/// outside the top-right of a `width` x `height` content box.
pub fn placeholder_texts(width: f32) -> (Primitive, Primitive) {
    let font_size = 1.27;
    let make = |text: &str, y: f32| {
        Primitive::Text(TextShape {
            x: width + 0.5,
            y,
            text: text.to_string(),
            font_size,
            anchor: TextAnchor::Start,
            baseline: TextBaseline::Middle,
            style: Style::default(),
        })
    };
    (
        make(REF_PLACEHOLDER, 0.0),
        make(VALUE_PLACEHOLDER, font_size * 1.4),
    )
}
