//! Typed preference store over a persisted key/value backend.
//!
//! The backend keeps one typed value per schema key, seeded from defaults,
//! optionally merged from a TOML file under the user config directory and
//! saved back on every write (load-or-generate, validate and clamp on load).
//! Every successful write emits `changed::<key>` on the backend's signal hub
//! synchronously, which is what the corner widgets subscribe to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::signals::{SignalHub, SignalId};

/// The type of a schema key, fixed at declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Boolean,
    Integer,
    Double,
    String,
}

#[derive(Debug, Clone, Copy)]
pub struct PreferenceKey {
    pub kind: Kind,
    pub name: &'static str,
}

const fn key(kind: Kind, name: &'static str) -> PreferenceKey {
    PreferenceKey { kind, name }
}

/// Every schema key. Names are dash-separated lowercase; the in-memory
/// accessor on [`Settings`] is the same name with underscores.
pub const KEYS: &[PreferenceKey] = &[
    key(Kind::Boolean, "panel-corners"),
    key(Kind::Boolean, "screen-corners"),
    key(Kind::Boolean, "force-extension-values"),
    key(Kind::Integer, "panel-corner-radius"),
    key(Kind::Integer, "panel-corner-border-width"),
    key(Kind::String, "panel-corner-background-color"),
    key(Kind::Double, "panel-corner-opacity"),
    key(Kind::Integer, "screen-corner-radius"),
    key(Kind::String, "screen-corner-background-color"),
    key(Kind::Double, "screen-corner-opacity"),
    key(Kind::Boolean, "debug"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Double(f64),
    Text(String),
}

impl Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Double(_) => Kind::Double,
            Value::Text(_) => Kind::String,
        }
    }
}

const MAX_LENGTH: i32 = 500;
const MAX_OPACITY: f64 = 1.0;

fn defaults() -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    let mut put = |name: &str, value: Value| map.insert(name.to_string(), value);
    put("panel-corners", Value::Boolean(true));
    put("screen-corners", Value::Boolean(false));
    put("force-extension-values", Value::Boolean(false));
    put("panel-corner-radius", Value::Integer(12));
    put("panel-corner-border-width", Value::Integer(0));
    put(
        "panel-corner-background-color",
        Value::Text("#000000ff".to_string()),
    );
    put("panel-corner-opacity", Value::Double(1.0));
    put("screen-corner-radius", Value::Integer(12));
    put(
        "screen-corner-background-color",
        Value::Text("#000000ff".to_string()),
    );
    put("screen-corner-opacity", Value::Double(1.0));
    put("debug", Value::Boolean(false));
    map
}

/// Persisted key/value store behind the typed accessors.
pub struct SettingsBackend {
    path: Option<PathBuf>,
    values: RefCell<BTreeMap<String, Value>>,
    hub: Rc<SignalHub>,
}

impl SettingsBackend {
    /// Backend with schema defaults only, nothing touches the filesystem.
    pub fn in_memory() -> Rc<Self> {
        Rc::new(Self {
            path: None,
            values: RefCell::new(defaults()),
            hub: SignalHub::new(),
        })
    }

    fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("rounded-corners");
        path.push("settings.toml");
        path
    }

    /// Load the store from `path` (or the default config location), merging
    /// the file over schema defaults. A missing file is generated; a
    /// malformed file is preserved and reported, and defaults are used for
    /// the session.
    pub fn load(path: Option<PathBuf>) -> Rc<Self> {
        let path = path.unwrap_or_else(Self::default_path);
        let mut values = defaults();

        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<BTreeMap<String, Value>>(&contents) {
                Ok(stored) => {
                    for (name, value) in stored {
                        match values.get(&name) {
                            Some(existing) if existing.kind() == value.kind() => {
                                values.insert(name, value);
                            }
                            Some(existing) => warn!(
                                key = %name,
                                expected = ?existing.kind(),
                                got = ?value.kind(),
                                "ignoring stored value of wrong type"
                            ),
                            None => warn!(key = %name, "ignoring unknown stored key"),
                        }
                    }
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to parse settings file");
                    error!(path = %path.display(), "file preserved, using defaults for this session");
                }
            },
            Err(_) => {
                let backend = Self {
                    path: Some(path.clone()),
                    values: RefCell::new(values),
                    hub: SignalHub::new(),
                };
                validate_and_clamp(&mut backend.values.borrow_mut());
                if let Err(e) = backend.save() {
                    error!(error = ?e, "failed to generate settings file");
                } else {
                    info!(path = %path.display(), "generated settings file for user to edit");
                }
                return Rc::new(backend);
            }
        }

        validate_and_clamp(&mut values);
        Rc::new(Self {
            path: Some(path),
            values: RefCell::new(values),
            hub: SignalHub::new(),
        })
    }

    pub fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!(
                "failed to create settings directory: {}",
                parent.display()
            ))?;
        }
        let contents = toml::to_string_pretty(&*self.values.borrow())
            .context("failed to serialize settings to TOML")?;
        fs::write(path, contents)
            .context(format!("failed to write settings file to {}", path.display()))?;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.values
            .borrow()
            .get(name)
            .cloned()
            .with_context(|| format!("no such settings key: {name}"))
    }

    /// Store `value` under `name`, persist, then notify listeners. The
    /// notification re-enters `changed::` handlers synchronously.
    fn set(&self, name: &str, value: Value) -> Result<()> {
        {
            let mut values = self.values.borrow_mut();
            let existing = values
                .get(name)
                .with_context(|| format!("no such settings key: {name}"))?;
            if existing.kind() != value.kind() {
                bail!(
                    "type mismatch for key {name}: declared {:?}, got {:?}",
                    existing.kind(),
                    value.kind()
                );
            }
            values.insert(name.to_string(), value);
        }
        if let Err(e) = self.save() {
            error!(key = %name, error = ?e, "failed to persist setting");
        }
        self.hub.emit(&changed_signal(name));
        Ok(())
    }
}

fn validate_and_clamp(values: &mut BTreeMap<String, Value>) {
    for (name, value) in values.iter_mut() {
        match value {
            Value::Integer(length) => {
                if *length < 0 {
                    warn!(key = %name, value = *length, "negative length, clamping to 0");
                    *length = 0;
                } else if *length > MAX_LENGTH {
                    warn!(key = %name, value = *length, max = MAX_LENGTH, "length exceeds maximum, clamping");
                    *length = MAX_LENGTH;
                }
            }
            Value::Double(opacity) => {
                if *opacity < 0.0 {
                    warn!(key = %name, value = *opacity, "negative opacity, clamping to 0");
                    *opacity = 0.0;
                } else if *opacity > MAX_OPACITY {
                    warn!(key = %name, value = *opacity, max = MAX_OPACITY, "opacity exceeds maximum, clamping");
                    *opacity = MAX_OPACITY;
                }
            }
            Value::Boolean(_) | Value::Text(_) => {}
        }
    }
}

pub fn changed_signal(name: &str) -> String {
    format!("changed::{name}")
}

/// Conversion between one Rust type and its `Value` representation.
pub trait SettingKind: Sized {
    const KIND: Kind;
    fn into_value(self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
    fn fallback() -> Self;
}

impl SettingKind for bool {
    const KIND: Kind = Kind::Boolean;
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }
    fn fallback() -> Self {
        false
    }
}

impl SettingKind for i32 {
    const KIND: Kind = Kind::Integer;
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(v),
            _ => None,
        }
    }
    fn fallback() -> Self {
        0
    }
}

impl SettingKind for f64 {
    const KIND: Kind = Kind::Double;
    fn into_value(self) -> Value {
        Value::Double(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
    fn fallback() -> Self {
        0.0
    }
}

impl SettingKind for String {
    const KIND: Kind = Kind::String;
    fn into_value(self) -> Value {
        Value::Text(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
    fn fallback() -> Self {
        String::new()
    }
}

/// Typed accessor for one schema key. The key is guaranteed to exist with
/// the right kind by construction, so `get` is infallible; a mismatch would
/// be a programming error and falls back to the type default with a log.
pub struct Pref<T: SettingKind> {
    backend: Rc<SettingsBackend>,
    name: &'static str,
    changed_ids: RefCell<Vec<SignalId>>,
    _kind: PhantomData<T>,
}

impl<T: SettingKind> Pref<T> {
    fn new(backend: Rc<SettingsBackend>, name: &'static str) -> Self {
        Self {
            backend,
            name,
            changed_ids: RefCell::new(Vec::new()),
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T {
        match self.backend.get(self.name).ok().and_then(T::from_value) {
            Some(v) => v,
            None => {
                error!(key = %self.name, "settings key missing or of wrong kind");
                T::fallback()
            }
        }
    }

    /// Persist the value and fan the change notification out synchronously.
    pub fn set(&self, v: T) {
        if let Err(e) = self.backend.set(self.name, v.into_value()) {
            error!(key = %self.name, error = %e, "failed to store setting");
        }
    }

    /// Register a change listener; the handle can be passed to
    /// [`Pref::disconnect`] or is dropped by `disconnect_all_settings`.
    pub fn changed(&self, cb: impl Fn() + 'static) -> SignalId {
        let id = self.backend.hub.connect(&changed_signal(self.name), cb);
        self.changed_ids.borrow_mut().push(id);
        id
    }

    pub fn disconnect(&self, id: SignalId) {
        self.changed_ids.borrow_mut().retain(|known| *known != id);
        if let Err(e) = self.backend.hub.disconnect(id) {
            warn!(key = %self.name, error = %e, "error removing settings listener, continuing");
        }
    }

    fn disconnect_all(&self) {
        for id in self.changed_ids.borrow_mut().drain(..) {
            if let Err(e) = self.backend.hub.disconnect(id) {
                warn!(key = %self.name, error = %e, "error removing settings listener, continuing");
            }
        }
    }
}

/// Reference to a typed accessor, returned by name lookup.
pub enum PrefRef<'a> {
    Boolean(&'a Pref<bool>),
    Integer(&'a Pref<i32>),
    Double(&'a Pref<f64>),
    Text(&'a Pref<String>),
}

/// One typed accessor per schema key, built once per enable cycle.
pub struct Settings {
    backend: Rc<SettingsBackend>,
    pub panel_corners: Pref<bool>,
    pub screen_corners: Pref<bool>,
    pub force_extension_values: Pref<bool>,
    pub panel_corner_radius: Pref<i32>,
    pub panel_corner_border_width: Pref<i32>,
    pub panel_corner_background_color: Pref<String>,
    pub panel_corner_opacity: Pref<f64>,
    pub screen_corner_radius: Pref<i32>,
    pub screen_corner_background_color: Pref<String>,
    pub screen_corner_opacity: Pref<f64>,
    pub debug: Pref<bool>,
}

impl Settings {
    pub fn new(backend: Rc<SettingsBackend>) -> Rc<Self> {
        Rc::new(Self {
            panel_corners: Pref::new(Rc::clone(&backend), "panel-corners"),
            screen_corners: Pref::new(Rc::clone(&backend), "screen-corners"),
            force_extension_values: Pref::new(Rc::clone(&backend), "force-extension-values"),
            panel_corner_radius: Pref::new(Rc::clone(&backend), "panel-corner-radius"),
            panel_corner_border_width: Pref::new(Rc::clone(&backend), "panel-corner-border-width"),
            panel_corner_background_color: Pref::new(
                Rc::clone(&backend),
                "panel-corner-background-color",
            ),
            panel_corner_opacity: Pref::new(Rc::clone(&backend), "panel-corner-opacity"),
            screen_corner_radius: Pref::new(Rc::clone(&backend), "screen-corner-radius"),
            screen_corner_background_color: Pref::new(
                Rc::clone(&backend),
                "screen-corner-background-color",
            ),
            screen_corner_opacity: Pref::new(Rc::clone(&backend), "screen-corner-opacity"),
            debug: Pref::new(Rc::clone(&backend), "debug"),
            backend,
        })
    }

    pub fn backend(&self) -> &Rc<SettingsBackend> {
        &self.backend
    }

    pub fn keys(&self) -> &'static [PreferenceKey] {
        KEYS
    }

    /// Look an accessor up by schema name. Accepts the theme-property form
    /// with a leading dash (`-panel-corner-radius`). Unknown names are a
    /// programming error surfaced as NotFound.
    pub fn get_property(&self, name: &str) -> Result<PrefRef<'_>> {
        let name = name.strip_prefix('-').unwrap_or(name);
        let pref = match name {
            "panel-corners" => PrefRef::Boolean(&self.panel_corners),
            "screen-corners" => PrefRef::Boolean(&self.screen_corners),
            "force-extension-values" => PrefRef::Boolean(&self.force_extension_values),
            "panel-corner-radius" => PrefRef::Integer(&self.panel_corner_radius),
            "panel-corner-border-width" => PrefRef::Integer(&self.panel_corner_border_width),
            "panel-corner-background-color" => PrefRef::Text(&self.panel_corner_background_color),
            "panel-corner-opacity" => PrefRef::Double(&self.panel_corner_opacity),
            "screen-corner-radius" => PrefRef::Integer(&self.screen_corner_radius),
            "screen-corner-background-color" => PrefRef::Text(&self.screen_corner_background_color),
            "screen-corner-opacity" => PrefRef::Double(&self.screen_corner_opacity),
            "debug" => PrefRef::Boolean(&self.debug),
            _ => bail!("no settings property named {name}"),
        };
        Ok(pref)
    }

    /// Drop every listener registered through `changed()` on any accessor.
    /// Used at shutdown of the preference layer itself.
    pub fn disconnect_all_settings(&self) {
        self.panel_corners.disconnect_all();
        self.screen_corners.disconnect_all();
        self.force_extension_values.disconnect_all();
        self.panel_corner_radius.disconnect_all();
        self.panel_corner_border_width.disconnect_all();
        self.panel_corner_background_color.disconnect_all();
        self.panel_corner_opacity.disconnect_all();
        self.screen_corner_radius.disconnect_all();
        self.screen_corner_background_color.disconnect_all();
        self.screen_corner_opacity.disconnect_all();
        self.debug.disconnect_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_defaults_cover_every_key() {
        let map = defaults();
        for key in KEYS {
            let value = map.get(key.name).unwrap();
            assert_eq!(value.kind(), key.kind, "kind mismatch for {}", key.name);
        }
        assert_eq!(map.len(), KEYS.len());
    }

    #[test]
    fn test_every_accessor_carries_its_declared_kind() {
        let prefs = Settings::new(SettingsBackend::in_memory());

        assert!(prefs.panel_corners.get());
        assert!(!prefs.screen_corners.get());
        assert!(!prefs.force_extension_values.get());
        assert_eq!(prefs.panel_corner_radius.get(), 12);
        assert_eq!(prefs.panel_corner_border_width.get(), 0);
        assert_eq!(prefs.panel_corner_background_color.get(), "#000000ff");
        assert_eq!(prefs.panel_corner_opacity.get(), 1.0);
        assert_eq!(prefs.screen_corner_radius.get(), 12);
        assert_eq!(prefs.screen_corner_background_color.get(), "#000000ff");
        assert_eq!(prefs.screen_corner_opacity.get(), 1.0);
        assert!(!prefs.debug.get());
    }

    #[test]
    fn test_typed_round_trip_through_get_property() {
        let prefs = Settings::new(SettingsBackend::in_memory());

        match prefs.get_property("panel-corner-radius").unwrap() {
            PrefRef::Integer(p) => {
                p.set(16);
                assert_eq!(p.get(), 16);
            }
            _ => panic!("wrong accessor kind"),
        }
        match prefs.get_property("panel-corner-opacity").unwrap() {
            PrefRef::Double(p) => {
                p.set(0.5);
                assert_eq!(p.get(), 0.5);
            }
            _ => panic!("wrong accessor kind"),
        }
        match prefs.get_property("panel-corner-background-color").unwrap() {
            PrefRef::Text(p) => {
                p.set("#aabbccdd".to_string());
                assert_eq!(p.get(), "#aabbccdd");
            }
            _ => panic!("wrong accessor kind"),
        }
        match prefs.get_property("debug").unwrap() {
            PrefRef::Boolean(p) => {
                p.set(true);
                assert!(p.get());
            }
            _ => panic!("wrong accessor kind"),
        }
    }

    #[test]
    fn test_get_property_accepts_theme_form() {
        let prefs = Settings::new(SettingsBackend::in_memory());
        assert!(prefs.get_property("-panel-corner-radius").is_ok());
    }

    #[test]
    fn test_get_property_unknown_name_fails() {
        let prefs = Settings::new(SettingsBackend::in_memory());
        assert!(prefs.get_property("no-such-key").is_err());
    }

    #[test]
    fn test_set_notifies_synchronously() {
        let prefs = Settings::new(SettingsBackend::in_memory());
        let hits = Rc::new(Cell::new(0));

        let hits_clone = Rc::clone(&hits);
        prefs
            .panel_corner_radius
            .changed(move || hits_clone.set(hits_clone.get() + 1));

        prefs.panel_corner_radius.set(20);
        assert_eq!(hits.get(), 1);
        // other keys do not fire this listener
        prefs.debug.set(true);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_disconnect_all_settings_silences_listeners() {
        let prefs = Settings::new(SettingsBackend::in_memory());
        let hits = Rc::new(Cell::new(0));

        for _ in 0..3 {
            let hits_clone = Rc::clone(&hits);
            prefs
                .debug
                .changed(move || hits_clone.set(hits_clone.get() + 1));
        }

        prefs.disconnect_all_settings();
        prefs.debug.set(true);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_individual_disconnect() {
        let prefs = Settings::new(SettingsBackend::in_memory());
        let hits = Rc::new(Cell::new(0));

        let hits_clone = Rc::clone(&hits);
        let id = prefs
            .screen_corner_opacity
            .changed(move || hits_clone.set(hits_clone.get() + 1));
        prefs.screen_corner_opacity.disconnect(id);
        // double disconnect is tolerated
        prefs.screen_corner_opacity.disconnect(id);

        prefs.screen_corner_opacity.set(0.3);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_backend_rejects_kind_mismatch() {
        let backend = SettingsBackend::in_memory();
        assert!(backend.set("debug", Value::Integer(1)).is_err());
        assert!(backend.set("unknown-key", Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut values = defaults();
        values.insert("panel-corner-radius".to_string(), Value::Integer(-4));
        values.insert("screen-corner-radius".to_string(), Value::Integer(9999));
        values.insert("panel-corner-opacity".to_string(), Value::Double(3.0));
        values.insert("screen-corner-opacity".to_string(), Value::Double(-0.5));

        validate_and_clamp(&mut values);

        assert_eq!(values["panel-corner-radius"], Value::Integer(0));
        assert_eq!(values["screen-corner-radius"], Value::Integer(MAX_LENGTH));
        assert_eq!(values["panel-corner-opacity"], Value::Double(1.0));
        assert_eq!(values["screen-corner-opacity"], Value::Double(0.0));
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let dir = std::env::temp_dir().join("rounded-corners-settings-test");
        let path = dir.join("settings.toml");
        let _ = fs::remove_file(&path);

        // first load generates the file with defaults
        let backend = SettingsBackend::load(Some(path.clone()));
        assert!(path.exists());
        let prefs = Settings::new(backend);
        prefs.panel_corner_radius.set(24);
        drop(prefs);

        // second load sees the persisted value
        let prefs = Settings::new(SettingsBackend::load(Some(path.clone())));
        assert_eq!(prefs.panel_corner_radius.get(), 24);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(&dir);
    }
}
