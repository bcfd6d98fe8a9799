//! Resolution of visual property values.
//!
//! Every property a corner draws with comes either from the host theme or
//! from the user preference of the same name. The rule, applied per lookup:
//! the preference wins when force-override is enabled, when no theme node is
//! available, or when the node has no value for the property; the theme
//! value wins otherwise. Nothing here is cached; each recompute re-reads
//! from scratch.

use tracing::{debug, error};

use crate::color::Rgba;
use crate::settings::{PrefRef, Settings};
use crate::theme::{ThemeContext, ThemeNode};

fn use_preference(node: Option<&ThemeNode>, prefs: &Settings) -> bool {
    prefs.force_extension_values.get() || node.is_none()
}

/// Resolve a length property (`-panel-corner-radius` and friends).
/// Preference lengths are scaled by the active display scale factor; theme
/// lengths come pre-scaled.
pub fn resolve_length(
    node: Option<&ThemeNode>,
    prop: &str,
    prefs: &Settings,
    ctx: &ThemeContext,
) -> f64 {
    if !use_preference(node, prefs)
        && let Some(node) = node
        && let Some(value) = node.lookup_length(prop)
    {
        return value;
    }
    preference_number(prop, prefs) * ctx.scale_factor()
}

/// Resolve a unit-free double property (opacity).
pub fn resolve_double(node: Option<&ThemeNode>, prop: &str, prefs: &Settings) -> f64 {
    if !use_preference(node, prefs)
        && let Some(node) = node
        && let Some(value) = node.lookup_double(prop)
    {
        return value;
    }
    preference_number(prop, prefs)
}

/// Resolve a color property. A malformed stored color is not fatal: the
/// value is replaced by opaque black, the corrected string is written back
/// into the store, and black is returned.
pub fn resolve_color(node: Option<&ThemeNode>, prop: &str, prefs: &Settings) -> Rgba {
    if !use_preference(node, prefs)
        && let Some(node) = node
        && let Some(value) = node.lookup_color(prop)
    {
        return value;
    }

    let accessor = match prefs.get_property(prop) {
        Ok(PrefRef::Text(p)) => p,
        _ => {
            error!(prop = %prop, "color property has no string preference");
            return Rgba::BLACK;
        }
    };

    let stored = accessor.get();
    match Rgba::parse(&stored) {
        Some(color) => color,
        None => {
            if prefs.debug.get() {
                debug!(prop = %prop, stored = %stored, "could not parse color, defaulting to black");
            }
            accessor.set(Rgba::BLACK.to_hex_string());
            Rgba::BLACK
        }
    }
}

fn preference_number(prop: &str, prefs: &Settings) -> f64 {
    match prefs.get_property(prop) {
        Ok(PrefRef::Integer(p)) => f64::from(p.get()),
        Ok(PrefRef::Double(p)) => p.get(),
        Ok(_) => {
            error!(prop = %prop, "preference is not numeric");
            0.0
        }
        Err(e) => {
            error!(prop = %prop, error = %e, "unknown visual property");
            0.0
        }
    }
}
