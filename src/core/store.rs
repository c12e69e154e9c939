//! Immutable parsed configuration snapshot.

use crate::error::{ConfigError, Result};
use ini::{Ini, ParseOption};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};

/// Name of the section whose options act as fallbacks for every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A parsed configuration file: a mapping from `(section, option)` to a string value.
///
/// A store is built once per successful parse and never mutated afterwards. The
/// watcher publishes a fresh store on every reparse, so readers holding an older
/// `Arc<ConfigStore>` keep seeing a consistent view.
///
/// Option names are case-insensitive. Section names are case-sensitive, except that
/// the fallback section is recognised as `DEFAULT` in any case.
///
/// # Examples
///
/// ```rust
/// use doorbell_config::core::ConfigStore;
///
/// let store = ConfigStore::from_ini_str("[ha]\ntimeout = 5\n").unwrap();
/// assert_eq!(store.get_int("ha", "timeout").unwrap(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    sections: HashMap<String, HashMap<String, String>>,
    defaults: HashMap<String, String>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text into a store.
    ///
    /// Section names keep their case and values are taken verbatim: backslashes
    /// and quotes are not interpreted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the text is not valid INI, if an
    /// option appears before the first section header, or if a section or an
    /// option within one section is repeated. Indented continuation lines are not
    /// supported and are rejected too.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let parsed = Ini::load_from_str_opt(
            text,
            ParseOption {
                enabled_quote: false,
                enabled_escape: false,
            },
        )?;

        let mut seen_sections = HashSet::new();
        let mut sections = Vec::new();
        for (name, properties) in parsed.iter() {
            let Some(name) = name else {
                if let Some((option, _)) = properties.iter().next() {
                    return Err(ConfigError::ParseError(format!(
                        "option '{}' is not inside a section header",
                        option
                    )));
                }
                continue;
            };

            let section_key = if name.eq_ignore_ascii_case(DEFAULT_SECTION) {
                DEFAULT_SECTION
            } else {
                name
            };
            if !seen_sections.insert(section_key) {
                return Err(ConfigError::ParseError(format!(
                    "section '{}' is defined more than once",
                    name
                )));
            }

            let mut seen_options = HashSet::new();
            let mut options = Vec::new();
            for (option, value) in properties.iter() {
                // An indented continuation line runs into the next key
                if option.contains(['\n', '\r']) {
                    return Err(ConfigError::ParseError(format!(
                        "multi-line value before '{}' in section '{}' is not supported",
                        option.trim(),
                        name
                    )));
                }
                if !seen_options.insert(option.to_lowercase()) {
                    return Err(ConfigError::ParseError(format!(
                        "option '{}' in section '{}' is defined more than once",
                        option, name
                    )));
                }
                options.push((option.to_string(), value.to_string()));
            }
            sections.push((name.to_string(), options));
        }

        Ok(Self::from_sections(sections))
    }

    /// Build a store from already-split sections.
    ///
    /// Option names are lowercased and values trimmed. A section named `DEFAULT`
    /// (in any case) becomes the fallback section.
    pub fn from_sections<S, O, V>(sections: impl IntoIterator<Item = (S, O)>) -> Self
    where
        S: Into<String>,
        O: IntoIterator<Item = (V, V)>,
        V: Into<String>,
    {
        let mut store = Self::new();
        for (name, options) in sections {
            let name = name.into();
            let options: HashMap<String, String> = options
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into().trim().to_string()))
                .collect();

            if name.eq_ignore_ascii_case(DEFAULT_SECTION) {
                store.defaults.extend(options);
            } else {
                store.sections.entry(name).or_default().extend(options);
            }
        }
        store
    }

    /// Names of all sections, excluding `DEFAULT`.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Whether the named section exists. `DEFAULT` is never reported as a section.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Whether the option exists in the section, or in `DEFAULT`.
    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.lookup(section, option).is_ok()
    }

    /// Whether the store holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.defaults.is_empty()
    }

    /// Get an option as a string.
    ///
    /// # Errors
    ///
    /// Returns `MissingSection` if the section does not exist and `MissingOption` if
    /// neither the section nor `DEFAULT` define the option.
    pub fn get_string(&self, section: &str, option: &str) -> Result<&str> {
        self.lookup(section, option)
    }

    /// Get an option as a signed integer.
    pub fn get_int(&self, section: &str, option: &str) -> Result<i64> {
        let raw = self.lookup(section, option)?;
        raw.parse::<i64>().map_err(|e| {
            ConfigError::invalid_value(section, option, format!("'{}' is not an integer: {}", raw, e))
        })
    }

    /// Get an option as a float.
    pub fn get_float(&self, section: &str, option: &str) -> Result<f64> {
        let raw = self.lookup(section, option)?;
        raw.parse::<f64>().map_err(|e| {
            ConfigError::invalid_value(section, option, format!("'{}' is not a float: {}", raw, e))
        })
    }

    /// Get an option as a boolean.
    ///
    /// Accepts `1`, `yes`, `true`, `on` and `0`, `no`, `false`, `off`, ignoring case.
    pub fn get_bool(&self, section: &str, option: &str) -> Result<bool> {
        let raw = self.lookup(section, option)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(true),
            "0" | "no" | "false" | "off" => Ok(false),
            _ => Err(ConfigError::invalid_value(
                section,
                option,
                format!("'{}' is not a boolean", raw),
            )),
        }
    }

    /// Deserialize one section, merged over `DEFAULT`, into a typed value.
    ///
    /// String values are coerced into numbers and booleans where the target
    /// type asks for them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use doorbell_config::core::ConfigStore;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Ha {
    ///     timeout: u64,
    /// }
    ///
    /// let store = ConfigStore::from_ini_str("[ha]\ntimeout = 5\n").unwrap();
    /// let ha: Ha = store.section("ha").unwrap();
    /// assert_eq!(ha.timeout, 5);
    /// ```
    pub fn section<T>(&self, section: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let options = self
            .sections
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

        let to_err = |e: config::ConfigError| ConfigError::DeserializationError {
            section: section.to_string(),
            reason: e.to_string(),
        };

        let mut builder = config::Config::builder();
        for (key, value) in self.defaults.iter().chain(options.iter()) {
            builder = builder.set_override(key, value.as_str()).map_err(to_err)?;
        }

        builder.build().map_err(to_err)?.try_deserialize::<T>().map_err(to_err)
    }

    fn lookup(&self, section: &str, option: &str) -> Result<&str> {
        let option_key = option.to_lowercase();

        if section.eq_ignore_ascii_case(DEFAULT_SECTION) {
            return self
                .defaults
                .get(&option_key)
                .map(String::as_str)
                .ok_or_else(|| ConfigError::MissingOption {
                    section: section.to_string(),
                    option: option.to_string(),
                });
        }

        let options = self
            .sections
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

        options
            .get(&option_key)
            .or_else(|| self.defaults.get(&option_key))
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingOption {
                section: section.to_string(),
                option: option.to_string(),
            })
    }
}
