use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single procedure option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ArgValue {
    /// Parse a command-line value: `true`/`false`, then integer, then float,
    /// otherwise text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(flag) = raw.parse::<bool>() {
            ArgValue::Bool(flag)
        } else if let Ok(int) = raw.parse::<i64>() {
            ArgValue::Integer(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            ArgValue::Float(float)
        } else {
            ArgValue::Text(raw.to_string())
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::Integer(_) => "integer",
            ArgValue::Float(_) => "float",
            ArgValue::Text(_) => "text",
        }
    }

    /// Whether `self` may stand in for an option whose default is `default`.
    /// Integers are accepted where floats are expected.
    fn fits(&self, default: &ArgValue) -> bool {
        matches!(
            (self, default),
            (ArgValue::Bool(_), ArgValue::Bool(_))
                | (ArgValue::Integer(_), ArgValue::Integer(_))
                | (ArgValue::Integer(_), ArgValue::Float(_))
                | (ArgValue::Float(_), ArgValue::Float(_))
                | (ArgValue::Text(_), ArgValue::Text(_))
        )
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{v}"),
            ArgValue::Integer(v) => write!(f, "{v}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Integer(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

/// Named, independently overridable procedure options.
///
/// A procedure publishes its defaults; callers clone them, override what they
/// need and pass the copy to the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(BTreeMap<String, ArgValue>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite options with every value present in `overrides`.
    pub fn apply(&mut self, overrides: &Arguments) {
        for (name, value) in overrides.iter() {
            self.set(name, value.clone());
        }
    }

    /// Parse a TOML table of option values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidArgument(format!("argument file: {e}")))
    }

    /// Parse a `name=value` assignment as given on the command line.
    pub fn parse_assignment(raw: &str) -> Result<(String, ArgValue)> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| Error::InvalidArgument(format!("expected name=value, got '{raw}'")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument(format!("missing option name in '{raw}'")));
        }
        Ok((name.to_string(), ArgValue::parse(value)))
    }

    /// Check every option against the procedure's defaults: the name must be
    /// known and the value must have a compatible type.
    pub fn check_against(&self, defaults: &Arguments, procedure: &str) -> Result<()> {
        for (name, value) in self.iter() {
            let default = defaults.get(name).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "procedure '{procedure}' has no option '{name}'"
                ))
            })?;
            if !value.fits(default) {
                return Err(Error::InvalidArgument(format!(
                    "option '{name}' of procedure '{procedure}' expects {}, got {} ({value})",
                    default.type_name(),
                    value.type_name()
                )));
            }
        }
        Ok(())
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ArgValue::Float(v) => Ok(*v),
            ArgValue::Integer(v) => Ok(*v as f64),
            other => Err(mistyped(name, "float", other)),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ArgValue::Integer(v) => Ok(*v),
            other => Err(mistyped(name, "integer", other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ArgValue::Bool(v) => Ok(*v),
            other => Err(mistyped(name, "bool", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            ArgValue::Text(v) => Ok(v),
            other => Err(mistyped(name, "text", other)),
        }
    }

    fn require(&self, name: &str) -> Result<&ArgValue> {
        self.get(name)
            .ok_or_else(|| Error::InvalidArgument(format!("missing option '{name}'")))
    }
}

fn mistyped(name: &str, expected: &str, found: &ArgValue) -> Error {
    Error::InvalidArgument(format!(
        "option '{name}' should be {expected}, got {} ({found})",
        found.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Arguments {
        Arguments::new()
            .with("cutoff_hz", 30.0)
            .with("order", 2_i64)
            .with("zero_phase", false)
            .with("wave", "ecg")
    }

    #[test]
    fn overriding_a_copy_leaves_defaults_alone() {
        let defaults = defaults();
        let mut args = defaults.clone();
        args.set("cutoff_hz", 12.5);
        assert_eq!(defaults.float("cutoff_hz").unwrap(), 30.0);
        assert_eq!(args.float("cutoff_hz").unwrap(), 12.5);
    }

    #[test]
    fn typed_getters() {
        let args = defaults();
        assert_eq!(args.integer("order").unwrap(), 2);
        assert_eq!(args.float("order").unwrap(), 2.0);
        assert!(!args.flag("zero_phase").unwrap());
        assert_eq!(args.text("wave").unwrap(), "ecg");
        assert!(args.integer("cutoff_hz").is_err());
        assert!(args.float("missing").is_err());
    }

    #[test]
    fn check_rejects_unknown_and_mistyped_options() {
        let defaults = defaults();
        let ok = Arguments::new().with("cutoff_hz", 20_i64);
        assert!(ok.check_against(&defaults, "filter").is_ok());
        let unknown = Arguments::new().with("cutof_hz", 20.0);
        assert!(matches!(
            unknown.check_against(&defaults, "filter"),
            Err(Error::InvalidArgument(_))
        ));
        let mistyped = Arguments::new().with("order", 2.5);
        assert!(mistyped.check_against(&defaults, "filter").is_err());
    }

    #[test]
    fn parses_toml_and_assignments() {
        let args = Arguments::from_toml_str("cutoff_hz = 25.0\norder = 4\nwave = \"bp\"\n").unwrap();
        assert_eq!(args.float("cutoff_hz").unwrap(), 25.0);
        assert_eq!(args.integer("order").unwrap(), 4);
        assert_eq!(args.text("wave").unwrap(), "bp");

        assert_eq!(
            Arguments::parse_assignment("order=3").unwrap(),
            ("order".to_string(), ArgValue::Integer(3))
        );
        assert_eq!(
            Arguments::parse_assignment("cutoff_hz = 0.5").unwrap(),
            ("cutoff_hz".to_string(), ArgValue::Float(0.5))
        );
        assert!(Arguments::parse_assignment("novalue").is_err());
    }

    #[test]
    fn apply_overwrites_present_values() {
        let mut args = defaults();
        args.apply(&Arguments::new().with("order", 6_i64));
        assert_eq!(args.integer("order").unwrap(), 6);
        assert_eq!(args.len(), 4);
    }
}
