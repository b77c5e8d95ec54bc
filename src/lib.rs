// src/lib.rs

pub mod easyeda;
pub mod error;
pub mod geometry;
pub mod kicad;
pub mod model;
pub mod registry;
pub mod sexpr;

use crate::error::Result;
use crate::model::Symbol;

/// Converts an already-retrieved EasyEDA symbol record (JSON form) into a
/// canonical symbol.
pub fn import_easyeda_symbol(data: &serde_json::Value) -> Result<Symbol> {
    let record = easyeda::EeShapeRecord::from_value(data)?;
    easyeda::convert_symbol(&record)
}

/// Converts the named symbol out of KiCad symbol library text.
pub fn import_kicad_symbol(source: &str, name: &str) -> Result<Symbol> {
    kicad::convert_symbol(source, name)
}
