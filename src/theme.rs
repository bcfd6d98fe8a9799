//! Host-computed style data, treated as read-only input.

use std::cell::Cell;
use std::collections::HashMap;

use crate::color::Rgba;

/// Cascaded style values the host computed for one widget. Lengths are
/// already scaled for the active display.
#[derive(Debug, Clone, Default)]
pub struct ThemeNode {
    lengths: HashMap<String, f64>,
    doubles: HashMap<String, f64>,
    colors: HashMap<String, Rgba>,
    transition_duration_ms: f64,
}

impl ThemeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, prop: &str, value: f64) -> Self {
        self.lengths.insert(prop.to_string(), value);
        self
    }

    pub fn with_double(mut self, prop: &str, value: f64) -> Self {
        self.doubles.insert(prop.to_string(), value);
        self
    }

    pub fn with_color(mut self, prop: &str, value: Rgba) -> Self {
        self.colors.insert(prop.to_string(), value);
        self
    }

    pub fn with_transition_duration(mut self, ms: f64) -> Self {
        self.transition_duration_ms = ms;
        self
    }

    pub fn lookup_length(&self, prop: &str) -> Option<f64> {
        self.lengths.get(prop).copied()
    }

    pub fn lookup_double(&self, prop: &str) -> Option<f64> {
        self.doubles.get(prop).copied()
    }

    pub fn lookup_color(&self, prop: &str) -> Option<Rgba> {
        self.colors.get(prop).copied()
    }

    pub fn transition_duration_ms(&self) -> f64 {
        self.transition_duration_ms
    }
}

/// Display-wide theming parameters owned by the host.
#[derive(Debug)]
pub struct ThemeContext {
    scale_factor: Cell<f64>,
    slow_down_factor: Cell<f64>,
}

impl Default for ThemeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeContext {
    pub fn new() -> Self {
        Self {
            scale_factor: Cell::new(1.0),
            slow_down_factor: Cell::new(1.0),
        }
    }

    /// Display scale applied to preference lengths (theme lengths come
    /// pre-scaled).
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor.get()
    }

    pub fn set_scale_factor(&self, factor: f64) {
        self.scale_factor.set(factor);
    }

    /// Divides animation durations, mirroring the host's global animation
    /// slow-down control.
    pub fn slow_down_factor(&self) -> f64 {
        self.slow_down_factor.get()
    }

    pub fn set_slow_down_factor(&self, factor: f64) {
        self.slow_down_factor.set(factor.max(f64::MIN_POSITIVE));
    }
}
