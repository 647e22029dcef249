//! Path parameter converters.
//!
//! A [`Converter`] pairs a regex fragment (what a segment must look like)
//! with a parse function (what the segment turns into). Converters live in a
//! [`ConverterRegistry`]; routes may supply their own registry of overrides,
//! which is layered over the global one through a [`ConverterScope`] without
//! ever mutating it.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name of the converter used when a placeholder omits one.
pub const DEFAULT_CONVERTER: &str = "default";

/// A converted path parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Text value (`default`, `str`, `rest_string`).
    Str(String),
    /// Signed integer value (`int`).
    Int(i64),
    /// Floating point value (`float`).
    Float(f64),
}

impl ParamValue {
    /// Returns the text value, if this is a string parameter.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer parameter.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value, if this is a float parameter.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Renders the value the way it appears in a path.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A segment's text was rejected by a converter's parse function.
///
/// Raised at request time and recovered inside the routing trie: the
/// candidate is skipped and lookup moves on to its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("converter `{converter}` rejected {value:?}: {reason}")]
pub struct ConversionError {
    /// Name the converter was registered under.
    pub converter: String,
    /// The raw text that failed to convert.
    pub value: String,
    /// Why the parse failed.
    pub reason: String,
}

type ParseFn = dyn Fn(&str) -> Result<ParamValue, String> + Send + Sync;

/// A named parser + matcher pair.
#[derive(Clone)]
pub struct Converter {
    name: String,
    pattern: String,
    consumes_separator: bool,
    parse: Arc<ParseFn>,
}

impl Converter {
    /// Creates a converter from a regex fragment and a parse function.
    ///
    /// The fragment must match the whole raw value; it is anchored by the
    /// trie. The name is assigned when the converter is registered.
    ///
    /// # Example
    ///
    /// ```
    /// use spangle_router::{Converter, ParamValue};
    ///
    /// let upper = Converter::new("[a-z]+", |raw: &str| {
    ///     Ok::<_, std::convert::Infallible>(ParamValue::Str(raw.to_uppercase()))
    /// });
    /// assert_eq!(upper.pattern(), "[a-z]+");
    /// ```
    pub fn new<F, E>(pattern: impl Into<String>, parse: F) -> Self
    where
        F: Fn(&str) -> Result<ParamValue, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            name: String::from("custom"),
            pattern: pattern.into(),
            consumes_separator: false,
            parse: Arc::new(move |raw| parse(raw).map_err(|e| e.to_string())),
        }
    }

    /// Marks the converter as able to match path separators.
    ///
    /// This only decides how the converter's pattern is expanded when the
    /// placeholder carries the `*` wildcard marker; an unmarked placeholder
    /// never spans separators.
    #[must_use]
    pub fn separator_consuming(mut self, consumes: bool) -> Self {
        self.consumes_separator = consumes;
        self
    }

    /// Returns the name this converter was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the regex fragment.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the converter's own pattern can match separators.
    #[must_use]
    pub fn consumes_separator(&self) -> bool {
        self.consumes_separator
    }

    /// Runs the parse function.
    pub fn convert(&self, raw: &str) -> Result<ParamValue, ConversionError> {
        (self.parse)(raw).map_err(|reason| ConversionError {
            converter: self.name.clone(),
            value: raw.to_owned(),
            reason,
        })
    }

    /// Two converters are interchangeable when they share both the parse
    /// function and the pattern.
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.parse, &other.parse)
            && self.pattern == other.pattern
            && self.consumes_separator == other.consumes_separator
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("consumes_separator", &self.consumes_separator)
            .finish_non_exhaustive()
    }
}

const SEGMENT_PATTERN: &str = "[^/]+";
const INT_PATTERN: &str = "[-+]?[0-9]+";
const FLOAT_PATTERN: &str = r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?";
const REST_PATTERN: &str = ".+";

fn parse_identity(raw: &str) -> Result<ParamValue, String> {
    Ok(ParamValue::Str(raw.to_owned()))
}

fn parse_int(raw: &str) -> Result<ParamValue, String> {
    raw.parse::<i64>()
        .map(ParamValue::Int)
        .map_err(|e| e.to_string())
}

fn parse_float(raw: &str) -> Result<ParamValue, String> {
    let value = raw.parse::<f64>().map_err(|e| e.to_string())?;
    if value.is_finite() {
        Ok(ParamValue::Float(value))
    } else {
        Err(String::from("value out of range"))
    }
}

/// Mapping from converter name to [`Converter`].
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Converter>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    ///
    /// Use this for per-route override maps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the built-in converters.
    ///
    /// | name | matches | value |
    /// |---|---|---|
    /// | `default`, `str`, `string` | one segment | [`ParamValue::Str`] |
    /// | `int` | optionally signed digits | [`ParamValue::Int`] |
    /// | `float` | decimal float | [`ParamValue::Float`] |
    /// | `rest_string` | anything, separators included when wildcarded | [`ParamValue::Str`] |
    #[must_use]
    pub fn with_builtins() -> Self {
        let identity = Converter::new(SEGMENT_PATTERN, parse_identity);
        let mut registry = Self::new();
        registry.register(DEFAULT_CONVERTER, identity.clone());
        registry.register("str", identity.clone());
        registry.register("string", identity);
        registry.register("int", Converter::new(INT_PATTERN, parse_int));
        registry.register("float", Converter::new(FLOAT_PATTERN, parse_float));
        registry.register(
            "rest_string",
            Converter::new(REST_PATTERN, parse_identity).separator_consuming(true),
        );
        registry
    }

    /// Registers a converter, returning the one it shadows.
    pub fn register(&mut self, name: impl Into<String>, converter: Converter) -> Option<Converter> {
        let name = name.into();
        let converter = converter.named(&name);
        self.converters.insert(name, converter)
    }

    /// Looks a converter up by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Converter> {
        self.converters.get(name)
    }

    /// Returns the number of registered converters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Iterates over registered converter names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.converters.keys().map(String::as_str)
    }
}

/// Read-only overlay of per-route overrides over a global registry.
#[derive(Debug, Clone, Copy)]
pub struct ConverterScope<'a> {
    overrides: &'a ConverterRegistry,
    global: &'a ConverterRegistry,
}

impl<'a> ConverterScope<'a> {
    /// Layers `overrides` over `global`.
    #[must_use]
    pub fn new(overrides: &'a ConverterRegistry, global: &'a ConverterRegistry) -> Self {
        Self { overrides, global }
    }

    /// Looks a name up in the overrides first, then the global registry.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'a Converter> {
        self.overrides
            .lookup(name)
            .or_else(|| self.global.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = ConverterRegistry::with_builtins();
        for name in ["default", "str", "string", "int", "float", "rest_string"] {
            assert!(registry.lookup(name).is_some(), "missing builtin {name}");
        }
        assert!(registry.lookup("uuid").is_none());
    }

    #[test]
    fn test_int_converter() {
        let registry = ConverterRegistry::with_builtins();
        let int = registry.lookup("int").unwrap();
        assert_eq!(int.convert("42").unwrap(), ParamValue::Int(42));
        assert_eq!(int.convert("-7").unwrap(), ParamValue::Int(-7));
        assert_eq!(int.convert("+7").unwrap(), ParamValue::Int(7));

        let err = int.convert("99999999999999999999").unwrap_err();
        assert_eq!(err.converter, "int");
        assert_eq!(err.value, "99999999999999999999");
        assert!(int.convert("12abc").is_err());
    }

    #[test]
    fn test_float_converter() {
        let registry = ConverterRegistry::with_builtins();
        let float = registry.lookup("float").unwrap();
        assert_eq!(float.convert("1.5").unwrap(), ParamValue::Float(1.5));
        assert_eq!(float.convert("2").unwrap(), ParamValue::Float(2.0));
        assert!(float.convert("1e999").is_err());
    }

    #[test]
    fn test_rest_string_is_separator_consuming() {
        let registry = ConverterRegistry::with_builtins();
        assert!(registry.lookup("rest_string").unwrap().consumes_separator());
        assert!(!registry.lookup("default").unwrap().consumes_separator());
    }

    #[test]
    fn test_register_names_converter_and_returns_shadowed() {
        let mut registry = ConverterRegistry::with_builtins();
        let custom = Converter::new("[a-z]+", |raw: &str| Ok::<_, String>(raw.into()));
        let shadowed = registry.register("int", custom);
        assert_eq!(shadowed.map(|c| c.pattern().to_owned()), Some(INT_PATTERN.to_owned()));
        assert_eq!(registry.lookup("int").unwrap().name(), "int");
        assert_eq!(registry.lookup("int").unwrap().pattern(), "[a-z]+");
    }

    #[test]
    fn test_scope_prefers_overrides_without_mutating_global() {
        let global = ConverterRegistry::with_builtins();
        let mut overrides = ConverterRegistry::new();
        overrides.register(
            "int",
            Converter::new("[0-9]+", |raw: &str| {
                Ok::<_, String>(ParamValue::Str(format!("n{raw}")))
            }),
        );

        let scope = ConverterScope::new(&overrides, &global);
        assert_eq!(scope.lookup("int").unwrap().pattern(), "[0-9]+");
        assert_eq!(scope.lookup("float").unwrap().pattern(), FLOAT_PATTERN);
        assert_eq!(global.lookup("int").unwrap().pattern(), INT_PATTERN);
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::from("cats").to_string(), "cats");
        assert_eq!(ParamValue::from(42).to_string(), "42");
        assert_eq!(ParamValue::from(1.25).to_string(), "1.25");
    }

    #[test]
    fn test_same_as() {
        let registry = ConverterRegistry::with_builtins();
        let default = registry.lookup("default").unwrap();
        let string = registry.lookup("str").unwrap();
        let int = registry.lookup("int").unwrap();
        assert!(default.same_as(string));
        assert!(!default.same_as(int));
    }
}
