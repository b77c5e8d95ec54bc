//! KiCad S-expression symbol converter.
//!
//! Walks a parsed `kicad_symbol_lib` tree for a named symbol (including
//! its nested sub-units) and converts it to canonical form. KiCad's Y axis
//! grows upward; the canonical frame's grows downward, so every Y
//! coordinate is negated on the way in.

use crate::error::{Error, Result};
use crate::geometry;
use crate::model::{
    ArcShape, BACKGROUND_FILL, CircleShape, Pin, PinKind, PinOrientation, PolylineShape,
    Primitive, Provenance, RectShape, Style, Symbol, THEME_STROKE, placeholder_texts,
};
use crate::sexpr::{self, Sexpr};
use glam::Vec2;
use std::collections::{HashMap, HashSet};

const LIBRARY_HEAD: &str = "kicad_symbol_lib";

/// Parses a symbol library and converts the symbol matching `name`.
pub fn convert_symbol(source: &str, name: &str) -> Result<Symbol> {
    let root = sexpr::parse(source).ok_or_else(|| {
        Error::ParseError("symbol library is empty or unbalanced".to_string())
    })?;
    let items = root
        .as_list()
        .filter(|items| items.first().and_then(Sexpr::as_str) == Some(LIBRARY_HEAD))
        .ok_or_else(|| Error::ParseError(format!("missing {LIBRARY_HEAD} head tag")))?;

    let node = find_symbol(items, name).ok_or_else(|| Error::SymbolNotFound(name.to_string()))?;
    let symbol_name = symbol_node_name(node).unwrap_or(name).to_string();

    let mut parts = SymbolParts::default();
    collect_node(node, &mut parts);

    if parts.pins.is_empty() && parts.primitives.is_empty() {
        // Some libraries nest their drawing units deeper than one level.
        log::debug!("no pins or graphics directly under {symbol_name}, re-scanning");
        collect_nested_symbols(node, &mut parts);
    }
    if parts.pins.is_empty() && parts.primitives.is_empty() {
        return Err(Error::MissingData(format!(
            "symbol {symbol_name} has no pins or graphics"
        )));
    }

    dedup_pins(&mut parts.pins);
    Ok(assemble(parts, symbol_name))
}

#[derive(Debug, Default)]
struct SymbolParts {
    primitives: Vec<Primitive>,
    pins: Vec<Pin>,
    properties: HashMap<String, String>,
}

fn symbol_node_name(node: &Sexpr) -> Option<&str> {
    node.as_list()?.get(1)?.as_str()
}

/// Top-level symbol search: exact (case-insensitive), then suffix after a
/// colon, then substring containment; first match in list order wins each
/// tier. Sub-unit nodes (`_1_`/`_0_` markers) are never search candidates.
fn find_symbol<'a>(items: &'a [Sexpr], name: &str) -> Option<&'a Sexpr> {
    let needle = name.to_lowercase();
    let candidates: Vec<(&Sexpr, String)> = items
        .iter()
        .filter_map(|item| {
            let list = item.as_list()?;
            if list.first()?.as_str()? != "symbol" {
                return None;
            }
            let node_name = list.get(1)?.as_str()?;
            if node_name.contains("_1_") || node_name.contains("_0_") {
                return None;
            }
            Some((item, node_name.to_lowercase()))
        })
        .collect();

    let exact = candidates.iter().find(|(_, n)| *n == needle);
    let suffix = || {
        candidates
            .iter()
            .find(|(_, n)| n.rsplit(':').next() == Some(needle.as_str()))
    };
    let substring = || candidates.iter().find(|(_, n)| n.contains(&needle));

    exact
        .or_else(suffix)
        .or_else(substring)
        .map(|(node, _)| *node)
}

/// Walks one symbol node: nested symbols are the multi-unit sub-symbols
/// and are recursed into; everything else converts in place.
fn collect_node(node: &Sexpr, parts: &mut SymbolParts) {
    let Some(items) = node.as_list() else { return };

    for child in items {
        let Some(list) = child.as_list() else { continue };
        match list.first().and_then(Sexpr::as_str) {
            Some("symbol") => collect_node(child, parts),
            Some("property") => collect_property(list, parts),
            Some("pin") => {
                if let Some(pin) = convert_pin(list) {
                    parts.pins.push(pin);
                } else {
                    log::warn!("skipping malformed pin node");
                }
            }
            Some("rectangle") => {
                if let Some(p) = convert_rectangle(list) {
                    parts.primitives.push(p);
                }
            }
            Some("polyline") => {
                if let Some(p) = convert_polyline(list) {
                    parts.primitives.push(p);
                }
            }
            Some("circle") => {
                if let Some(p) = convert_circle(list) {
                    parts.primitives.push(p);
                }
            }
            Some("arc") => {
                if let Some(p) = convert_arc(list) {
                    parts.primitives.push(p);
                }
            }
            _ => {}
        }
    }
}

/// Fallback rescan: process any symbol node found anywhere below `node`.
fn collect_nested_symbols(node: &Sexpr, parts: &mut SymbolParts) {
    let Some(items) = node.as_list() else { return };
    for child in items {
        if !child.is_list() {
            continue;
        }
        if child.as_list().and_then(|l| l.first()).and_then(Sexpr::as_str) == Some("symbol") {
            collect_node(child, parts);
        } else {
            collect_nested_symbols(child, parts);
        }
    }
}

/// First non-empty value for a property name wins; empty values never
/// overwrite anything.
fn collect_property(list: &[Sexpr], parts: &mut SymbolParts) {
    let Some(name) = list.get(1).and_then(atom_text) else {
        return;
    };
    let Some(value) = list.get(2).and_then(atom_text) else {
        return;
    };
    if name.is_empty() || value.is_empty() {
        return;
    }
    parts.properties.entry(name).or_insert(value);
}

fn atom_text(node: &Sexpr) -> Option<String> {
    match node {
        Sexpr::String(s) => Some(s.clone()),
        Sexpr::Number(n) => Some(if n.fract() == 0.0 {
            format!("{}", *n as i64)
        } else {
            format!("{n}")
        }),
        Sexpr::List(_) => None,
    }
}

fn child_list<'a>(items: &'a [Sexpr], name: &str) -> Option<&'a [Sexpr]> {
    items.iter().find_map(|item| {
        let list = item.as_list()?;
        if list.first()?.as_str()? == name {
            Some(list)
        } else {
            None
        }
    })
}

fn nth_number(list: &[Sexpr], index: usize) -> Option<f32> {
    list.get(index)?.as_number()
}

/// Reads `(at x y angle)`, negating Y into the canonical frame.
fn read_at(items: &[Sexpr]) -> Option<(f32, f32, f32)> {
    let at = child_list(items, "at")?;
    Some((
        nth_number(at, 1)?,
        -nth_number(at, 2)?,
        nth_number(at, 3).unwrap_or(0.0),
    ))
}

/// Reads a named point clause such as `(start x y)`, negating Y.
fn read_point(items: &[Sexpr], name: &str) -> Option<Vec2> {
    let point = child_list(items, name)?;
    Some(Vec2::new(nth_number(point, 1)?, -nth_number(point, 2)?))
}

fn convert_pin(items: &[Sexpr]) -> Option<Pin> {
    let (x, y, angle) = read_at(items)?;

    let mut pin = Pin::new(
        child_list(items, "number")
            .and_then(|l| l.get(1))
            .and_then(atom_text)
            .unwrap_or_default(),
        child_list(items, "name")
            .and_then(|l| l.get(1))
            .and_then(atom_text)
            .unwrap_or_default(),
        x,
        y,
    );
    pin.kind = map_pin_kind(items.get(1).and_then(Sexpr::as_str).unwrap_or(""));
    pin.length = child_list(items, "length")
        .and_then(|l| nth_number(l, 1))
        .unwrap_or(0.0);
    pin.orientation = orientation_from_angle(angle);
    Some(pin)
}

/// KiCad pin angles point the way the lead extends from the connection
/// point: the opposite convention from EasyEDA's header rotation.
fn orientation_from_angle(angle: f32) -> PinOrientation {
    match angle.rem_euclid(360.0).round() as i32 {
        0 => PinOrientation::Right,
        90 => PinOrientation::Up,
        180 => PinOrientation::Left,
        270 => PinOrientation::Down,
        other => {
            log::debug!("unexpected pin angle {other}, defaulting to right");
            PinOrientation::Right
        }
    }
}

fn map_pin_kind(kind: &str) -> PinKind {
    match kind {
        "input" => PinKind::Input,
        "output" => PinKind::Output,
        "bidirectional" => PinKind::Bidirectional,
        "power_in" => PinKind::PowerIn,
        "power_out" => PinKind::PowerOut,
        _ => PinKind::Passive,
    }
}

fn convert_rectangle(items: &[Sexpr]) -> Option<Primitive> {
    let start = read_point(items, "start")?;
    let end = read_point(items, "end")?;
    let min = start.min(end);
    let size = (end - start).abs();
    Some(Primitive::Rect(RectShape {
        x: min.x,
        y: min.y,
        width: size.x,
        height: size.y,
        rx: 0.0,
        ry: 0.0,
        style: parse_style(items),
    }))
}

fn convert_polyline(items: &[Sexpr]) -> Option<Primitive> {
    let pts = child_list(items, "pts")?;
    let points: Vec<(f32, f32)> = pts
        .iter()
        .filter_map(|item| {
            let xy = item.as_list()?;
            if xy.first()?.as_str()? != "xy" {
                return None;
            }
            Some((nth_number(xy, 1)?, -nth_number(xy, 2)?))
        })
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(Primitive::Polyline(PolylineShape {
        points,
        style: parse_style(items),
    }))
}

fn convert_circle(items: &[Sexpr]) -> Option<Primitive> {
    let center = read_point(items, "center")?;
    let radius = child_list(items, "radius").and_then(|l| nth_number(l, 1))?;
    Some(Primitive::Circle(CircleShape {
        cx: center.x,
        cy: center.y,
        radius,
        style: parse_style(items),
    }))
}

/// KiCad arcs are three points; the center is the circumscribed circle of
/// start/mid/end. Collinear points degrade to a unit circle at the mid
/// point instead of failing.
fn convert_arc(items: &[Sexpr]) -> Option<Primitive> {
    let start = read_point(items, "start")?;
    let mid = read_point(items, "mid")?;
    let end = read_point(items, "end")?;
    let style = parse_style(items);

    let Some(center) = circumcenter(start, mid, end) else {
        log::debug!("collinear arc points, substituting a degenerate circle");
        return Some(Primitive::Circle(CircleShape {
            cx: mid.x,
            cy: mid.y,
            radius: 1.0,
            style,
        }));
    };

    let radius = (start - center).length();
    let start_angle = (start - center).y.atan2((start - center).x).to_degrees();
    let end_angle = (end - center).y.atan2((end - center).x).to_degrees();
    Some(Primitive::Arc(ArcShape {
        cx: center.x,
        cy: center.y,
        radius,
        start_angle,
        end_angle,
        style,
    }))
}

fn circumcenter(a: Vec2, b: Vec2, c: Vec2) -> Option<Vec2> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-6 {
        return None;
    }
    let ux = (a.length_squared() * (b.y - c.y)
        + b.length_squared() * (c.y - a.y)
        + c.length_squared() * (a.y - b.y))
        / d;
    let uy = (a.length_squared() * (c.x - b.x)
        + b.length_squared() * (a.x - c.x)
        + c.length_squared() * (b.x - a.x))
        / d;
    Some(Vec2::new(ux, uy))
}

/// Stroke color is rewritten to a theme-neutral marker unless the source
/// carries an explicit RGB triple; fills map to none, the outline marker,
/// or the fixed light background color.
fn parse_style(items: &[Sexpr]) -> Style {
    let mut style = Style::default();

    let stroke = child_list(items, "stroke");
    style.stroke = Some(stroke_color(stroke.and_then(|s| child_list(s, "color"))));
    style.stroke_width = stroke
        .and_then(|s| child_list(s, "width"))
        .and_then(|w| nth_number(w, 1));

    style.fill = child_list(items, "fill")
        .and_then(|f| child_list(f, "type"))
        .and_then(|t| t.get(1))
        .and_then(Sexpr::as_str)
        .map(|kind| match kind {
            "outline" => THEME_STROKE.to_string(),
            "background" => BACKGROUND_FILL.to_string(),
            _ => "none".to_string(),
        });

    style
}

fn stroke_color(color: Option<&[Sexpr]>) -> String {
    if let Some(color) = color {
        let r = nth_number(color, 1).unwrap_or(0.0);
        let g = nth_number(color, 2).unwrap_or(0.0);
        let b = nth_number(color, 3).unwrap_or(0.0);
        let a = nth_number(color, 4).unwrap_or(0.0);
        if r != 0.0 || g != 0.0 || b != 0.0 || a != 0.0 {
            return format!("rgb({},{},{})", r as i32, g as i32, b as i32);
        }
    }
    THEME_STROKE.to_string()
}

/// Multi-unit parts repeat identical power pins across units; collapse
/// pins sharing a rounded connection coordinate.
fn dedup_pins(pins: &mut Vec<Pin>) {
    let mut seen = HashSet::new();
    pins.retain(|pin| {
        seen.insert((
            (pin.x * 100.0).round() as i64,
            (pin.y * 100.0).round() as i64,
        ))
    });
}

/// Origin normalization plus the placeholder texts, mirroring the EasyEDA
/// post-processing (KiCad sources are already in millimeters).
fn assemble(mut parts: SymbolParts, name: String) -> Symbol {
    let content = geometry::content_bounds(&parts.primitives, &parts.pins);
    let offset = content.map(|b| b.min).unwrap_or(Vec2::ZERO);

    for primitive in &mut parts.primitives {
        geometry::offset_scale_primitive(primitive, offset, 1.0);
    }
    for pin in &mut parts.pins {
        geometry::offset_scale_pin(pin, offset, 1.0);
    }

    let (width, height) = match geometry::content_bounds(&parts.primitives, &parts.pins) {
        Some(b) => (b.width(), b.height()),
        None => (0.0, 0.0),
    };

    let (reference, value) = placeholder_texts(width);
    parts.primitives.push(reference);
    parts.primitives.push(value);

    Symbol {
        name,
        width,
        height,
        origin_x: 0.0,
        origin_y: 0.0,
        primitives: parts.primitives,
        pins: parts.pins,
        properties: parts.properties,
        provenance: Provenance::KiCad,
    }
}
