//! Engine definitions as they appear in tournament settings files.
//!
//! The mapping uses the keys `name`, `command`, `workingDirectory`,
//! `protocol`, `initStrings`, `whitepov`, `restart`, `validateClaims`,
//! `variants`, `options` and `rating`. Unknown keys are ignored and missing
//! keys take their defaults; values equal to their default are omitted when
//! serializing.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use chess::STANDARD_VARIANT;

/// When the runner should restart an engine process between games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Let the engine protocol decide.
    #[default]
    Auto,
    On,
    Off,
}

impl RestartMode {
    fn is_auto(&self) -> bool {
        *self == Self::Auto
    }
}

/// A configurable engine option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineOption {
    Check {
        name: String,
        #[serde(default)]
        value: bool,
        #[serde(default)]
        default: bool,
    },
    Spin {
        name: String,
        value: i64,
        #[serde(default)]
        default: i64,
        min: i64,
        max: i64,
    },
    Combo {
        name: String,
        value: String,
        #[serde(default)]
        default: String,
        choices: Vec<String>,
    },
    Button {
        name: String,
    },
    #[serde(alias = "string")]
    Text {
        name: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        default: String,
    },
}

impl EngineOption {
    pub fn name(&self) -> &str {
        match self {
            Self::Check { name, .. }
            | Self::Spin { name, .. }
            | Self::Combo { name, .. }
            | Self::Button { name }
            | Self::Text { name, .. } => name,
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        match self {
            Self::Check { .. } => value.is_boolean(),
            Self::Spin { min, max, .. } => value
                .as_i64()
                .is_some_and(|v| (*min..=*max).contains(&v)),
            Self::Combo { choices, .. } => value
                .as_str()
                .is_some_and(|v| choices.iter().any(|c| c == v)),
            Self::Button { .. } => true,
            Self::Text { .. } => value.is_string(),
        }
    }

    /// Store `value` if it is valid for this option. Returns false otherwise.
    pub fn set_value(&mut self, value: &Value) -> bool {
        if !self.is_valid(value) {
            return false;
        }
        match self {
            Self::Check { value: v, .. } => *v = value.as_bool().unwrap_or_default(),
            Self::Spin { value: v, .. } => *v = value.as_i64().unwrap_or_default(),
            Self::Combo { value: v, .. } | Self::Text { value: v, .. } => {
                *v = value.as_str().unwrap_or_default().to_string()
            }
            Self::Button { .. } => {}
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default)]
    pub protocol: String,
    /// Command line arguments; supplied on the command line, never persisted.
    #[serde(skip)]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_strings: Vec<String>,
    /// Engine reports scores from white's point of view.
    #[serde(
        default,
        rename = "whitepov",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub white_eval_pov: bool,
    #[serde(
        default,
        deserialize_with = "lenient_restart",
        skip_serializing_if = "RestartMode::is_auto"
    )]
    pub restart: RestartMode,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub validate_claims: bool,
    #[serde(default = "default_variants", skip_serializing_if = "is_standard_only")]
    pub variants: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<EngineOption>,
    #[serde(
        default,
        deserialize_with = "non_negative_rating",
        skip_serializing_if = "is_zero"
    )]
    pub rating: u32,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            working_directory: String::new(),
            protocol: String::new(),
            arguments: Vec::new(),
            init_strings: Vec::new(),
            white_eval_pov: false,
            restart: RestartMode::Auto,
            validate_claims: true,
            variants: default_variants(),
            options: Vec::new(),
            rating: 0,
        }
    }
}

impl EngineConfiguration {
    pub fn new(name: &str, command: &str, protocol: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            protocol: protocol.to_string(),
            ..Default::default()
        }
    }

    /// Append init strings, one per line of `text`.
    pub fn add_init_string(&mut self, text: &str) {
        self.init_strings
            .extend(text.split('\n').map(|line| line.to_string()));
    }

    pub fn add_argument(&mut self, argument: &str) {
        self.arguments.push(argument.to_string());
    }

    /// Negative ratings are stored as zero.
    pub fn set_rating(&mut self, rating: i64) {
        self.rating = clamp_rating(rating);
    }

    pub fn supports_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }

    /// Set the value of option `name`.
    ///
    /// Options that are not declared are added as text options. Values the
    /// declared option rejects are logged and ignored.
    pub fn set_option(&mut self, name: &str, value: Value) {
        if let Some(option) = self.options.iter_mut().find(|o| o.name() == name) {
            if !option.set_value(&value) {
                tracing::warn!(option = name, %value, "Invalid value for engine option");
            }
            return;
        }

        let text = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.options.push(EngineOption::Text {
            name: name.to_string(),
            value: text.clone(),
            default: text,
        });
    }

    pub fn option(&self, name: &str) -> Option<&EngineOption> {
        self.options.iter().find(|o| o.name() == name)
    }
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

fn default_variants() -> Vec<String> {
    vec![STANDARD_VARIANT.to_string()]
}

fn is_standard_only(variants: &[String]) -> bool {
    variants.iter().all(|v| v == STANDARD_VARIANT)
}

fn clamp_rating(rating: i64) -> u32 {
    rating.clamp(0, u32::MAX as i64) as u32
}

fn non_negative_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let rating = i64::deserialize(deserializer)?;
    Ok(clamp_rating(rating))
}

/// Unknown restart values keep the default.
fn lenient_restart<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RestartMode, D::Error> {
    let value = String::deserialize(deserializer)?;
    Ok(match value.as_str() {
        "on" => RestartMode::On,
        "off" => RestartMode::Off,
        _ => RestartMode::Auto,
    })
}

/// Option descriptors that do not parse are skipped.
fn lenient_options<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<EngineOption>, D::Error> {
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<EngineOption>(v.clone()) {
            Ok(option) => Some(option),
            Err(e) => {
                tracing::warn!(descriptor = %v, "Skipping engine option: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: EngineConfiguration = serde_json::from_value(json!({
            "name": "Stockfish",
            "command": "stockfish",
            "protocol": "uci"
        }))
        .unwrap();

        assert_eq!(config.name, "Stockfish");
        assert_eq!(config.restart, RestartMode::Auto);
        assert!(config.validate_claims);
        assert_eq!(config.variants, vec!["standard"]);
        assert_eq!(config.rating, 0);
        assert!(!config.white_eval_pov);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_all_keys_parsed() {
        let config: EngineConfiguration = serde_json::from_value(json!({
            "name": "Crafty",
            "command": "./crafty",
            "workingDirectory": "/opt/crafty",
            "protocol": "xboard",
            "initStrings": ["hash 64M", "egtb off"],
            "whitepov": true,
            "restart": "off",
            "validateClaims": false,
            "variants": ["standard", "fischerandom"],
            "rating": 2700,
            "somethingElse": 42
        }))
        .unwrap();

        assert_eq!(config.working_directory, "/opt/crafty");
        assert_eq!(config.init_strings.len(), 2);
        assert!(config.white_eval_pov);
        assert_eq!(config.restart, RestartMode::Off);
        assert!(!config.validate_claims);
        assert!(config.supports_variant("fischerandom"));
        assert_eq!(config.rating, 2700);
    }

    #[test]
    fn test_negative_rating_coerced_to_zero() {
        let config: EngineConfiguration =
            serde_json::from_value(json!({ "name": "x", "rating": -150 })).unwrap();
        assert_eq!(config.rating, 0);

        let mut config = EngineConfiguration::default();
        config.set_rating(-1);
        assert_eq!(config.rating, 0);
    }

    #[test]
    fn test_unknown_restart_value_keeps_auto() {
        let config: EngineConfiguration =
            serde_json::from_value(json!({ "name": "x", "restart": "sometimes" })).unwrap();
        assert_eq!(config.restart, RestartMode::Auto);
    }

    #[test]
    fn test_defaults_omitted_when_serialized() {
        let config = EngineConfiguration::new("Toga", "toga", "uci");
        let value = serde_json::to_value(&config).unwrap();
        let map = value.as_object().unwrap();

        let mut keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["command", "name", "protocol", "workingDirectory"]);
    }

    #[test]
    fn test_non_default_values_serialized() {
        let mut config = EngineConfiguration::new("Toga", "toga", "uci");
        config.restart = RestartMode::On;
        config.validate_claims = false;
        config.rating = 2400;
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["restart"], "on");
        assert_eq!(value["validateClaims"], false);
        assert_eq!(value["rating"], 2400);

        let back: EngineConfiguration = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_option_descriptors_skipped() {
        let config: EngineConfiguration = serde_json::from_value(json!({
            "name": "x",
            "options": [
                { "type": "spin", "name": "Hash", "value": 16, "min": 1, "max": 1024 },
                { "type": "teleport", "name": "Bogus" },
                { "type": "check", "name": "Ponder", "value": false }
            ]
        }))
        .unwrap();
        assert_eq!(config.options.len(), 2);
        assert_eq!(config.options[0].name(), "Hash");
        assert_eq!(config.options[1].name(), "Ponder");
    }

    #[test]
    fn test_set_option_validates() {
        let mut config = EngineConfiguration::default();
        config.options.push(EngineOption::Spin {
            name: "Threads".to_string(),
            value: 1,
            default: 1,
            min: 1,
            max: 64,
        });

        config.set_option("Threads", json!(8));
        config.set_option("Threads", json!(1000));
        assert!(matches!(
            config.option("Threads"),
            Some(EngineOption::Spin { value: 8, .. })
        ));

        config.set_option("SyzygyPath", json!("/tb"));
        assert!(matches!(
            config.option("SyzygyPath"),
            Some(EngineOption::Text { value, .. }) if value == "/tb"
        ));
    }

    #[test]
    fn test_add_init_string_splits_lines() {
        let mut config = EngineConfiguration::default();
        config.add_init_string("new\nforce");
        assert_eq!(config.init_strings, vec!["new", "force"]);
    }
}
