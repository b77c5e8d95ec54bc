//! Named symbol definitions and component instances.
//!
//! The registry owns canonical symbols; instances hold a shared, read-only
//! reference plus their own transform state. Any caching beyond this map is
//! the caller's responsibility — the crate keeps no module-level state.

use crate::model::Symbol;
use std::collections::HashMap;
use std::sync::Arc;

/// Instance-creation options. Everything defaults to an untransformed,
/// unnamed placement.
#[derive(Debug, Clone, Default)]
pub struct InstanceOptions {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub mirror: bool,
    pub reference: String,
    pub value: String,
    pub properties: HashMap<String, String>,
}

/// A placed component: a shared symbol definition plus mutable transform
/// state. Requires single-writer discipline if mutated concurrently with
/// reads.
#[derive(Debug, Clone)]
pub struct Instance {
    pub symbol: Arc<Symbol>,
    pub x: f32,
    pub y: f32,
    /// Degrees, kept in 0..360.
    pub rotation: f32,
    /// Reflects the local X axis before rotation.
    pub mirror: bool,
    pub reference: String,
    pub value: String,
    pub properties: HashMap<String, String>,
}

impl Instance {
    pub fn new(symbol: Arc<Symbol>, options: InstanceOptions) -> Self {
        Instance {
            symbol,
            x: options.x,
            y: options.y,
            rotation: options.rotation.rem_euclid(360.0),
            mirror: options.mirror,
            reference: options.reference,
            value: options.value,
            properties: options.properties,
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }
}

/// Maps names to canonical symbol definitions.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    symbols: HashMap<String, Arc<Symbol>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        SymbolRegistry::default()
    }

    /// Registers a definition under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.symbols.insert(name.into(), Arc::new(symbol));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Symbol>> {
        self.symbols.get(name).cloned()
    }

    /// Binds a registered definition into a new instance, or `None` when no
    /// definition exists under `name`.
    pub fn instantiate(&self, name: &str, options: InstanceOptions) -> Option<Instance> {
        let symbol = self.lookup(name)?;
        Some(Instance::new(symbol, options))
    }
}
