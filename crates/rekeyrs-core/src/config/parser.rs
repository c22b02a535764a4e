// Rekeyrs Config Parser - TOML with Serde
// Parses profiles from TOML files and builds the router they describe

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::config::{KeyExprError, KeyExpression};
use crate::input::{DeviceFilter, KeyFilter, Registration};
use crate::key::vkey_from_name;
use crate::mapping::{KeyMapping, MappedAction, ToggleHandler};
use crate::output::ChordDefinition;
use crate::transform::{
    default_alt_codes, AltCodeComposer, DoubleTapConfig, KeyEventRouter, RouterConfig,
    DEFAULT_DOUBLE_TAP_WINDOW,
};
use crate::VirtualKey;

/// Largest accepted double-tap window
const MAX_WINDOW_MS: u64 = 1000;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key expression '{expr}': {source}")]
    InvalidKeyExpr {
        expr: String,
        #[source]
        source: KeyExprError,
    },

    #[error("Invalid key: {0}")]
    UnknownKey(String),

    #[error("Key '{key}' refers to unknown chord '{chord}'")]
    UnknownChord { key: String, chord: String },

    #[error("Key '{key}' delegates to unknown handler '{handler}'")]
    UnknownHandler { key: String, handler: String },

    #[error("Handler '{0}' cannot delegate again")]
    NestedDelegate(String),

    #[error("Invalid alt code entry: {0}")]
    InvalidAltCode(String),

    #[error("Invalid double tap trigger: {0}")]
    InvalidTrigger(String),

    #[error("Timeout value out of range: {0}")]
    TimeoutOutOfRange(String),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Which events the profile receives
    #[serde(default)]
    pub registration: Option<RegistrationToml>,

    /// Alt-code composition; absent disables the stage
    #[serde(default)]
    pub alt_code: Option<AltCodeToml>,

    /// Double-tap keys, tried in file order
    #[serde(default)]
    pub double_tap: Vec<DoubleTapToml>,

    /// Named chords
    #[serde(default)]
    pub chords: IndexMap<String, ChordToml>,

    /// Logical key -> action
    #[serde(default)]
    pub keymap: IndexMap<String, KeymapTomlValue>,

    /// Named sub-handlers for `delegate` actions
    #[serde(default)]
    pub handlers: IndexMap<String, HandlerToml>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationToml {
    /// Substring of the device id, `"*"` for all, or a list of them
    pub device_filter: Option<DeviceFilterToml>,
    /// Only `"*"` is supported
    pub key_filter: Option<String>,
    #[serde(default = "default_intercept")]
    pub intercept: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DeviceFilterToml {
    One(String),
    Many(Vec<String>),
}

impl DeviceFilterToml {
    fn to_filters(&self) -> Vec<DeviceFilter> {
        let filters: Vec<DeviceFilter> = match self {
            DeviceFilterToml::One(value) => vec![DeviceFilter::from_option(Some(value))],
            DeviceFilterToml::Many(values) => values
                .iter()
                .map(|value| DeviceFilter::from_option(Some(value)))
                .collect(),
        };
        // "*" anywhere in the list admits everything
        if filters.contains(&DeviceFilter::All) {
            vec![DeviceFilter::All]
        } else {
            filters
        }
    }
}

fn default_intercept() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AltCodeToml {
    #[serde(default = "default_alt_modifier")]
    pub modifier: String,
    /// Digit string -> character; absent uses the built-in codes
    pub table: Option<IndexMap<String, String>>,
}

fn default_alt_modifier() -> String {
    "alt".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoubleTapToml {
    pub trigger: String,
    pub window_ms: Option<u64>,
    pub single: String,
    pub double: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChordToml {
    pub modifier: String,
    /// Logical member -> key sent while the modifier is held
    #[serde(default)]
    pub members: IndexMap<String, String>,
}

/// Keymap value: a key expression string, `"noop"`, or a one-entry table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeymapTomlValue {
    Key(String),
    Action(KeymapTomlAction),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeymapTomlAction {
    Text(String),
    Chord(String),
    Delegate(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerToml {
    /// Lock key whose toggle state selects the branch
    pub toggle: String,
    pub on: KeymapTomlValue,
    pub off: KeymapTomlValue,
}

/// Validated configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub registration: Registration,
    pub composer: Option<AltCodeComposer>,
    pub double_taps: Vec<DoubleTapConfig>,
    pub chords: Vec<ChordDefinition>,
    pub mapping: KeyMapping,
    pub handlers: IndexMap<String, ToggleHandler>,
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// The built-in number-pad profile
    pub fn default_profile() -> Result<Self, ConfigError> {
        Self::from_toml(default_profile_content())
    }

    /// `~/.config/rekeyrs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rekeyrs").join("config.toml"))
    }

    /// Load `path`, else the default path if it exists, else the built-in profile
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            log::info!("Loading config from {}", path.display());
            return Self::from_toml_path(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_path(path)
            }
            _ => {
                log::info!("No config file found, using the built-in number pad profile");
                Self::default_profile()
            }
        }
    }

    /// Convert to RouterConfig for use in KeyEventRouter
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            composer: self.composer.clone(),
            double_taps: self.double_taps.clone(),
            chords: self.chords.clone(),
            mapping: self.mapping.clone(),
        }
    }

    /// Build a router with every handler registered
    pub fn build_router(&self) -> KeyEventRouter {
        let mut router = KeyEventRouter::new(self.router_config());
        for (name, handler) in &self.handlers {
            router.register_handler(name.clone(), Box::new(handler.clone()));
        }
        log::debug!(
            "Built router: {} mapped keys, {} chords, {} double taps, {} handlers",
            self.mapping.len(),
            self.chords.len(),
            self.double_taps.len(),
            self.handlers.len()
        );
        router
    }
}

impl ConfigToml {
    /// Convert parsed TOML to internal Config structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(registration) = &self.registration {
            config.registration = registration.to_registration()?;
        } else {
            config.registration.intercept = default_intercept();
        }

        if let Some(alt_code) = &self.alt_code {
            config.composer = Some(alt_code.to_composer()?);
        }

        for entry in &self.double_tap {
            config.double_taps.push(entry.to_double_tap()?);
        }

        for (name, chord) in &self.chords {
            let mut definition = ChordDefinition::new(name.clone(), parse_expr(&chord.modifier)?);
            for (member, key) in &chord.members {
                definition = definition.with_member(member.clone(), parse_expr(key)?);
            }
            config.chords.push(definition);
        }

        for (name, handler) in &self.handlers {
            let toggle = parse_vkey(&handler.toggle)?;
            let on = self.to_action(name, &handler.on)?;
            let off = self.to_action(name, &handler.off)?;
            if matches!(on, MappedAction::Delegate(_)) || matches!(off, MappedAction::Delegate(_)) {
                return Err(ConfigError::NestedDelegate(name.clone()));
            }
            config
                .handlers
                .insert(name.clone(), ToggleHandler::new(toggle, on, off));
        }

        for (logical, value) in &self.keymap {
            let action = self.to_action(logical, value)?;
            config.mapping.insert(logical.clone(), action);
        }

        Ok(config)
    }

    fn to_action(&self, key: &str, value: &KeymapTomlValue) -> Result<MappedAction, ConfigError> {
        match value {
            KeymapTomlValue::Key(s) if s.eq_ignore_ascii_case("noop") => Ok(MappedAction::Noop),
            KeymapTomlValue::Key(s) => Ok(MappedAction::Key(parse_expr(s)?)),
            KeymapTomlValue::Action(KeymapTomlAction::Text(text)) => {
                Ok(MappedAction::Text(text.clone()))
            }
            KeymapTomlValue::Action(KeymapTomlAction::Chord(chord)) => {
                let definition = self
                    .chords
                    .get(chord)
                    .ok_or_else(|| ConfigError::UnknownChord {
                        key: key.to_string(),
                        chord: chord.clone(),
                    })?;
                if !definition.members.contains_key(key) {
                    log::warn!("Key '{}' maps to chord '{}' but is not one of its members", key, chord);
                }
                Ok(MappedAction::Chord(chord.clone()))
            }
            KeymapTomlValue::Action(KeymapTomlAction::Delegate(handler)) => {
                if !self.handlers.contains_key(handler) {
                    return Err(ConfigError::UnknownHandler {
                        key: key.to_string(),
                        handler: handler.clone(),
                    });
                }
                Ok(MappedAction::Delegate(handler.clone()))
            }
        }
    }
}

impl RegistrationToml {
    fn to_registration(&self) -> Result<Registration, ConfigError> {
        let key_filter = match self.key_filter.as_deref() {
            None | Some("*") => KeyFilter::All,
            Some(other) => return Err(ConfigError::UnknownKey(format!("key filter '{}'", other))),
        };
        Ok(Registration {
            device_filters: self
                .device_filter
                .as_ref()
                .map(DeviceFilterToml::to_filters)
                .unwrap_or_default(),
            key_filter,
            intercept: self.intercept,
        })
    }
}

impl AltCodeToml {
    fn to_composer(&self) -> Result<AltCodeComposer, ConfigError> {
        let modifier = parse_vkey(&self.modifier)?;
        let table = match &self.table {
            None => default_alt_codes(),
            Some(entries) => {
                let mut table = IndexMap::new();
                for (code, value) in entries {
                    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                        return Err(ConfigError::InvalidAltCode(format!(
                            "'{}' is not a digit string",
                            code
                        )));
                    }
                    let mut chars = value.chars();
                    let ch = match (chars.next(), chars.next()) {
                        (Some(ch), None) => ch,
                        _ => {
                            return Err(ConfigError::InvalidAltCode(format!(
                                "'{}' must map to a single character, got '{}'",
                                code, value
                            )))
                        }
                    };
                    table.insert(code.clone(), ch);
                }
                table
            }
        };
        Ok(AltCodeComposer::new(modifier, table))
    }
}

impl DoubleTapToml {
    fn to_double_tap(&self) -> Result<DoubleTapConfig, ConfigError> {
        let mut chars = self.trigger.chars();
        let trigger = match (chars.next(), chars.next()) {
            (Some(ch), None) => ch,
            _ => return Err(ConfigError::InvalidTrigger(self.trigger.clone())),
        };
        let window = match self.window_ms {
            None => DEFAULT_DOUBLE_TAP_WINDOW,
            Some(ms) if (1..=MAX_WINDOW_MS).contains(&ms) => Duration::from_millis(ms),
            Some(ms) => {
                return Err(ConfigError::TimeoutOutOfRange(format!(
                    "double tap window_ms {} (must be 1..={})",
                    ms, MAX_WINDOW_MS
                )))
            }
        };
        Ok(DoubleTapConfig::new(trigger, self.single.clone(), self.double.clone()).with_window(window))
    }
}

fn parse_expr(s: &str) -> Result<KeyExpression, ConfigError> {
    KeyExpression::parse(s).map_err(|source| ConfigError::InvalidKeyExpr {
        expr: s.to_string(),
        source,
    })
}

fn parse_vkey(s: &str) -> Result<VirtualKey, ConfigError> {
    vkey_from_name(s).ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
}

/// Built-in profile for a 26-key USB number pad.
///
/// Num Lock on reports `numpad0`..`numpad9`, off reports the navigation
/// layer. The `( ) = $ € ¥` keys arrive as alt codes and the `00` key as two
/// fast presses of `0`.
pub fn default_profile_content() -> &'static str {
    r#"# rekeyrs number pad profile

[registration]
device_filter = ["PID_026C", "unknown"]
key_filter = "*"
intercept = true

[alt_code]
modifier = "alt"

[alt_code.table]
"36" = "$"
"40" = "("
"41" = ")"
"61" = "="
"0128" = "€"
"0165" = "¥"

[[double_tap]]
trigger = "0"
window_ms = 20
single = "numpad0"
double = "double_zero"

[chords.jog]
modifier = "shift"
members = { up = "up", down = "down", left = "left", right = "right" }

[handlers.numlock_subtract]
toggle = "num_lock"
on = "subtract"
off = "ctrl+z"

[keymap]
"$" = { text = "$" }
"(" = { text = "(" }
")" = { text = ")" }
"=" = { text = "=" }
"€" = { text = "€" }
"¥" = { text = "¥" }
double_zero = { text = "00" }

backspace = "backspace"
esc = "esc"
divide = "divide"
multiply = "multiply"
subtract = { delegate = "numlock_subtract" }
add = "add"
tab = "tab"
enter = "enter"
num_lock = "noop"

numpad0 = "numpad0"
numpad1 = "numpad1"
numpad2 = "numpad2"
numpad3 = "numpad3"
numpad4 = "numpad4"
numpad5 = "numpad5"
numpad6 = "numpad6"
numpad7 = "numpad7"
numpad8 = "numpad8"
numpad9 = "numpad9"
decimal = "decimal"

home = "home"
up = { chord = "jog" }
page_up = "page_up"
left = { chord = "jog" }
clear = "clear"
right = { chord = "jog" }
end = "end"
down = { chord = "jog" }
page_down = "page_down"
insert = "insert"
delete = "delete"
"#
}
