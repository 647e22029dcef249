//! Route template compilation.
//!
//! A template such as `/items/{id:int}/{rest:*rest_string}` is parsed into a
//! [`RoutePattern`]: an ordered list of [`Segment`]s plus whether the
//! template ends with a separator. Parsing is purely syntactic; converter
//! names are resolved when the pattern is bound (see [`RoutePattern::compile`]).
//!
//! # Placeholder syntax
//!
//! - `{name}`: one segment, `default` converter
//! - `{name:conv}`: one segment, converter `conv`
//! - `{name:*conv}`: wildcard, may span separators; must be the last segment
//!
//! A segment may carry literal text around a single placeholder
//! (`{id:int}.json`, `v{version:int}`).

use memchr::memchr_iter;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::converter::{
    ConversionError, Converter, ConverterScope, DEFAULT_CONVERTER, ParamValue,
};
use crate::r#match::PathParams;
use crate::slash::SlashVariant;

const WILDCARD_MARKER: char = '*';
const VALUE_GROUP: &str = "value";

/// Errors raised while parsing or binding a route template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// `{` and `}` do not pair up within a segment.
    #[error("unbalanced placeholder delimiters in segment `{segment}` of `{template}`")]
    Unbalanced { template: String, segment: String },
    /// A placeholder is empty or has an invalid name / converter.
    #[error("malformed placeholder `{placeholder}` in `{template}`")]
    Malformed { template: String, placeholder: String },
    /// More than one placeholder in one segment.
    #[error("segment `{segment}` of `{template}` holds more than one placeholder")]
    MultiplePlaceholders { template: String, segment: String },
    /// A parameter name is used twice.
    #[error("parameter `{name}` appears more than once in `{template}`")]
    DuplicateName { template: String, name: String },
    /// A wildcard placeholder is followed by more segments.
    #[error("wildcard `{name}` must be the last segment of `{template}`")]
    WildcardNotLast { template: String, name: String },
    /// The converter is neither overridden for the route nor registered.
    #[error("unknown converter `{converter}` in `{template}`")]
    UnknownConverter { template: String, converter: String },
    /// A converter's regex fragment does not compile.
    #[error("converter `{converter}` has an invalid pattern: {reason}")]
    InvalidConverterPattern { converter: String, reason: String },
}

/// Errors raised while rendering a pattern back into a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No value was supplied for a placeholder.
    #[error("missing value for parameter `{0}`")]
    MissingParam(String),
    /// A single-segment placeholder received a value containing `/`.
    #[error("value for parameter `{0}` contains a path separator")]
    SeparatorInValue(String),
    /// The rendered value would not be matched by the parameter's converter.
    #[error("value {value:?} for parameter `{name}` is not accepted by its converter")]
    Rejected { name: String, value: String },
}

/// A named dynamic part of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Placeholder {
    /// Parameter name.
    pub name: String,
    /// Converter name (without the wildcard marker).
    pub converter: String,
    /// Literal text before the placeholder within the segment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Literal text after the placeholder within the segment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suffix: String,
}

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Matches its text exactly.
    Literal { text: String },
    /// Matches exactly one path segment through a converter.
    Dynamic(Placeholder),
    /// Matches the rest of the path, separators included.
    Wildcard(Placeholder),
}

impl Segment {
    /// Returns the placeholder of a dynamic or wildcard segment.
    #[must_use]
    pub fn placeholder(&self) -> Option<&Placeholder> {
        match self {
            Self::Literal { .. } => None,
            Self::Dynamic(p) | Self::Wildcard(p) => Some(p),
        }
    }

    /// Whether this segment may span separators.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { text } => f.write_str(text),
            Self::Dynamic(p) => write!(f, "{}{{{}:{}}}{}", p.prefix, p.name, p.converter, p.suffix),
            Self::Wildcard(p) => write!(
                f,
                "{}{{{}:{WILDCARD_MARKER}{}}}{}",
                p.prefix, p.name, p.converter, p.suffix
            ),
        }
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoutePattern {
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl RoutePattern {
    /// Parses a template.
    ///
    /// A missing leading `/` is added and runs of `/` are collapsed, so
    /// `items//{id}` and `/items/{id}` compile to the same pattern.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let normalized = normalize_template(template);
        let trailing_slash = normalized.len() > 1 && normalized.ends_with('/');
        let body = normalized.trim_matches('/');

        let mut segments = Vec::new();
        let mut names = HashSet::new();
        if !body.is_empty() {
            for raw in body.split('/') {
                let segment = parse_segment(&normalized, raw)?;
                if let Some(p) = segment.placeholder() {
                    if !names.insert(p.name.clone()) {
                        return Err(PatternError::DuplicateName {
                            template: normalized.clone(),
                            name: p.name.clone(),
                        });
                    }
                }
                segments.push(segment);
            }
        }

        if let Some(pos) = segments.iter().position(Segment::is_wildcard) {
            if pos + 1 != segments.len() {
                let name = segments[pos]
                    .placeholder()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                return Err(PatternError::WildcardNotLast {
                    template: normalized,
                    name,
                });
            }
        }

        Ok(Self {
            segments,
            trailing_slash,
        })
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the template ends with a separator.
    #[must_use]
    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// Which trailing-slash variant the template itself spells.
    #[must_use]
    pub fn variant(&self) -> SlashVariant {
        if self.trailing_slash {
            SlashVariant::WithSlash
        } else {
            SlashVariant::WithoutSlash
        }
    }

    /// Whether this is the root pattern `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the same pattern spelled with the given trailing variant.
    #[must_use]
    pub fn with_variant(&self, variant: SlashVariant) -> Self {
        Self {
            segments: self.segments.clone(),
            trailing_slash: !self.is_root() && variant == SlashVariant::WithSlash,
        }
    }

    /// Iterates over parameter names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter_map(Segment::placeholder)
            .map(|p| p.name.as_str())
    }

    /// Renders the pattern into a concrete path.
    ///
    /// This is the inverse of matching for the built-in converters: parsing
    /// the rendered path yields `params` back.
    pub fn render(&self, params: &PathParams) -> Result<String, RenderError> {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal { text } => out.push_str(text),
                Segment::Dynamic(p) | Segment::Wildcard(p) => {
                    let value = params
                        .get(&p.name)
                        .ok_or_else(|| RenderError::MissingParam(p.name.clone()))?
                        .to_string();
                    if !segment.is_wildcard() && value.contains('/') {
                        return Err(RenderError::SeparatorInValue(p.name.clone()));
                    }
                    out.push_str(&p.prefix);
                    out.push_str(&value);
                    out.push_str(&p.suffix);
                }
            }
        }
        if out.is_empty() || self.trailing_slash {
            out.push('/');
        }
        Ok(out)
    }

    /// Resolves converter names and builds the segment matchers.
    pub fn compile(&self, scope: &ConverterScope<'_>) -> Result<CompiledPattern, PatternError> {
        let mut matchers = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let matcher = match segment {
                Segment::Literal { .. } => None,
                Segment::Dynamic(p) | Segment::Wildcard(p) => {
                    let converter = scope.lookup(&p.converter).ok_or_else(|| {
                        PatternError::UnknownConverter {
                            template: self.to_string(),
                            converter: p.converter.clone(),
                        }
                    })?;
                    Some(Matcher::new(p.clone(), converter.clone(), segment.is_wildcard())?)
                }
            };
            matchers.push(matcher);
        }
        Ok(CompiledPattern {
            pattern: self.clone(),
            matchers,
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        if self.segments.is_empty() || self.trailing_slash {
            f.write_str("/")?;
        }
        Ok(())
    }
}

/// A pattern whose converters have been resolved.
///
/// Useful on its own for parsing a single path against a single pattern
/// (the trie uses the same [`Matcher`]s internally).
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: RoutePattern,
    matchers: Vec<Option<Matcher>>,
}

impl CompiledPattern {
    /// Returns the underlying pattern.
    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Matches a path against this pattern alone.
    ///
    /// Returns `None` when the path does not fit, including when a converter
    /// rejects a segment. The trailing separator must agree with the pattern.
    #[must_use]
    pub fn parse(&self, path: &str) -> Option<PathParams> {
        let (parts, variant) = split_path(path);
        if variant != self.pattern.variant() {
            return None;
        }
        let mut params = PathParams::new();
        let segments = self.pattern.segments();
        for (idx, segment) in segments.iter().enumerate() {
            let matcher = self.matchers[idx].as_ref();
            match (segment, matcher) {
                (Segment::Literal { text }, _) => {
                    if parts.get(idx) != Some(&text.as_str()) {
                        return None;
                    }
                }
                (Segment::Wildcard(_), Some(m)) => {
                    if idx >= parts.len() {
                        return None;
                    }
                    let rest = parts[idx..].join("/");
                    let value = m.capture(&rest)?;
                    params.push(m.name(), value);
                    return Some(params);
                }
                (Segment::Dynamic(_), Some(m)) => {
                    let value = m.capture(parts.get(idx)?)?;
                    params.push(m.name(), value);
                }
                _ => return None,
            }
        }
        (parts.len() == segments.len()).then_some(params)
    }

    pub(crate) fn into_parts(self) -> (RoutePattern, Vec<Option<Matcher>>) {
        (self.pattern, self.matchers)
    }

    /// Renders after checking each value against its converter's matcher.
    pub fn render(&self, params: &PathParams) -> Result<String, RenderError> {
        for matcher in self.matchers.iter().flatten() {
            let name = matcher.name();
            let value = params
                .get(name)
                .ok_or_else(|| RenderError::MissingParam(name.to_owned()))?
                .to_string();
            if !matcher.accepts(&value) {
                return Err(RenderError::Rejected {
                    name: name.to_owned(),
                    value,
                });
            }
        }
        self.pattern.render(params)
    }
}

/// Anchored regex + converter for one placeholder.
#[derive(Debug, Clone)]
pub(crate) struct Matcher {
    placeholder: Placeholder,
    converter: Converter,
    regex: Regex,
}

impl Matcher {
    fn new(placeholder: Placeholder, converter: Converter, wildcard: bool) -> Result<Self, PatternError> {
        let fragment = converter.pattern();
        // A wildcard over a single-segment converter repeats it once per segment;
        // outside wildcard mode the trie only ever hands over one segment.
        let body = if wildcard && !converter.consumes_separator() {
            format!("(?:{fragment})(?:/(?:{fragment}))*")
        } else {
            format!("(?:{fragment})")
        };
        let source = format!(
            "^{}(?P<{VALUE_GROUP}>{body}){}$",
            regex::escape(&placeholder.prefix),
            regex::escape(&placeholder.suffix),
        );
        let regex = Regex::new(&source).map_err(|e| PatternError::InvalidConverterPattern {
            converter: placeholder.converter.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            placeholder,
            converter,
            regex,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.placeholder.name
    }

    pub(crate) fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    pub(crate) fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Matches and converts. A failed conversion counts as no match.
    pub(crate) fn capture(&self, text: &str) -> Option<ParamValue> {
        let caps = self.regex.captures(text)?;
        let raw = caps.name(VALUE_GROUP)?.as_str();
        match self.converter.convert(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log_rejection(&err);
                None
            }
        }
    }

    fn accepts(&self, value: &str) -> bool {
        let framed = format!("{}{value}{}", self.placeholder.prefix, self.placeholder.suffix);
        self.capture(&framed).is_some()
    }
}

fn log_rejection(err: &ConversionError) {
    tracing::trace!(
        converter = %err.converter,
        value = %err.value,
        reason = %err.reason,
        "segment rejected by converter"
    );
}

/// Splits a request path into segments and its trailing-slash variant.
///
/// The root path `/` (and the empty path) has no segments and is always
/// [`SlashVariant::WithoutSlash`].
///
/// ```
/// use spangle_router::{split_path, SlashVariant};
///
/// assert_eq!(split_path("/a/b/"), (vec!["a", "b"], SlashVariant::WithSlash));
/// assert_eq!(split_path("/"), (vec![], SlashVariant::WithoutSlash));
/// ```
#[must_use]
pub fn split_path(path: &str) -> (Vec<&str>, SlashVariant) {
    let body = path.strip_prefix('/').unwrap_or(path);
    if body.is_empty() {
        return (Vec::new(), SlashVariant::WithoutSlash);
    }
    let (body, variant) = match body.strip_suffix('/') {
        Some(stripped) => (stripped, SlashVariant::WithSlash),
        None => (body, SlashVariant::WithoutSlash),
    };

    let mut parts = Vec::new();
    let mut start = 0;
    for idx in memchr_iter(b'/', body.as_bytes()) {
        parts.push(&body[start..idx]);
        start = idx + 1;
    }
    parts.push(&body[start..]);
    (parts, variant)
}

fn normalize_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 1);
    out.push('/');
    for ch in template.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}

fn parse_segment(template: &str, raw: &str) -> Result<Segment, PatternError> {
    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();
    if opens != closes {
        return Err(PatternError::Unbalanced {
            template: template.to_owned(),
            segment: raw.to_owned(),
        });
    }
    if opens == 0 {
        return Ok(Segment::Literal {
            text: raw.to_owned(),
        });
    }
    if opens > 1 {
        return Err(PatternError::MultiplePlaceholders {
            template: template.to_owned(),
            segment: raw.to_owned(),
        });
    }

    let (Some(open), Some(close)) = (raw.find('{'), raw.find('}')) else {
        return Err(PatternError::Unbalanced {
            template: template.to_owned(),
            segment: raw.to_owned(),
        });
    };
    if close < open {
        return Err(PatternError::Unbalanced {
            template: template.to_owned(),
            segment: raw.to_owned(),
        });
    }

    let inner = &raw[open + 1..close];
    let malformed = || PatternError::Malformed {
        template: template.to_owned(),
        placeholder: inner.to_owned(),
    };
    let (name, converter) = match inner.split_once(':') {
        Some((name, converter)) => (name, Some(converter)),
        None => (inner, None),
    };
    if !is_identifier(name) {
        return Err(malformed());
    }
    let (converter, wildcard) = match converter {
        None => (DEFAULT_CONVERTER, false),
        Some(conv) => match conv.strip_prefix(WILDCARD_MARKER) {
            Some(rest) => (rest, true),
            None => (conv, false),
        },
    };
    if !is_identifier(converter) {
        return Err(malformed());
    }

    let placeholder = Placeholder {
        name: name.to_owned(),
        converter: converter.to_owned(),
        prefix: raw[..open].to_owned(),
        suffix: raw[close + 1..].to_owned(),
    };
    Ok(if wildcard {
        Segment::Wildcard(placeholder)
    } else {
        Segment::Dynamic(placeholder)
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterRegistry;

    fn compile(template: &str) -> CompiledPattern {
        let global = ConverterRegistry::with_builtins();
        let overrides = ConverterRegistry::new();
        RoutePattern::parse(template)
            .unwrap()
            .compile(&ConverterScope::new(&overrides, &global))
            .unwrap()
    }

    #[test]
    fn test_parse_literal_and_dynamic() {
        let pattern = RoutePattern::parse("/items/{id:int}").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal {
                    text: "items".into()
                },
                Segment::Dynamic(Placeholder {
                    name: "id".into(),
                    converter: "int".into(),
                    prefix: String::new(),
                    suffix: String::new(),
                }),
            ]
        );
        assert!(!pattern.has_trailing_slash());
    }

    #[test]
    fn test_omitted_converter_is_default() {
        let pattern = RoutePattern::parse("/{name}").unwrap();
        assert_eq!(pattern.segments()[0].placeholder().unwrap().converter, "default");
    }

    #[test]
    fn test_wildcard_marker() {
        let pattern = RoutePattern::parse("/{path:*rest_string}").unwrap();
        assert!(pattern.segments()[0].is_wildcard());
        assert_eq!(pattern.segments()[0].placeholder().unwrap().converter, "rest_string");

        let unmarked = RoutePattern::parse("/{path:rest_string}").unwrap();
        assert!(!unmarked.segments()[0].is_wildcard());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(
            RoutePattern::parse("items//{id}").unwrap(),
            RoutePattern::parse("/items/{id}").unwrap()
        );
        assert_eq!(RoutePattern::parse("").unwrap().to_string(), "/");
        assert_eq!(RoutePattern::parse("/").unwrap().to_string(), "/");
        assert!(RoutePattern::parse("/a/").unwrap().has_trailing_slash());
        assert!(!RoutePattern::parse("/").unwrap().has_trailing_slash());
    }

    #[test]
    fn test_display_canonical_form() {
        let pattern = RoutePattern::parse("/a/{b}/v{n:int}.json/{r:*rest_string}").unwrap();
        assert_eq!(pattern.to_string(), "/a/{b:default}/v{n:int}.json/{r:*rest_string}");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = RoutePattern::parse("/{id}/{id:int}").unwrap_err();
        assert!(matches!(err, PatternError::DuplicateName { name, .. } if name == "id"));
    }

    #[test]
    fn test_unbalanced_rejected() {
        assert!(matches!(
            RoutePattern::parse("/{id").unwrap_err(),
            PatternError::Unbalanced { .. }
        ));
        assert!(matches!(
            RoutePattern::parse("/id}").unwrap_err(),
            PatternError::Unbalanced { .. }
        ));
        assert!(matches!(
            RoutePattern::parse("/}id{").unwrap_err(),
            PatternError::Unbalanced { .. }
        ));
    }

    #[test]
    fn test_malformed_rejected() {
        for template in ["/{}", "/{:int}", "/{id:}", "/{id:*}", "/{1id}", "/{a b}"] {
            assert!(
                matches!(RoutePattern::parse(template), Err(PatternError::Malformed { .. })),
                "{template} should be malformed"
            );
        }
    }

    #[test]
    fn test_two_placeholders_in_segment_rejected() {
        assert!(matches!(
            RoutePattern::parse("/{a}-{b}").unwrap_err(),
            PatternError::MultiplePlaceholders { .. }
        ));
    }

    #[test]
    fn test_wildcard_not_last_rejected() {
        let err = RoutePattern::parse("/{rest:*rest_string}/fixed").unwrap_err();
        assert!(matches!(err, PatternError::WildcardNotLast { name, .. } if name == "rest"));
    }

    #[test]
    fn test_unknown_converter_at_bind_time() {
        let global = ConverterRegistry::with_builtins();
        let overrides = ConverterRegistry::new();
        let pattern = RoutePattern::parse("/{id:uuid}").unwrap();
        let err = pattern
            .compile(&ConverterScope::new(&overrides, &global))
            .unwrap_err();
        assert!(matches!(err, PatternError::UnknownConverter { converter, .. } if converter == "uuid"));
    }

    #[test]
    fn test_invalid_converter_regex() {
        let global = ConverterRegistry::with_builtins();
        let mut overrides = ConverterRegistry::new();
        overrides.register(
            "broken",
            Converter::new("[a-", |raw: &str| Ok::<_, String>(raw.into())),
        );
        let err = RoutePattern::parse("/{x:broken}")
            .unwrap()
            .compile(&ConverterScope::new(&overrides, &global))
            .unwrap_err();
        assert!(matches!(err, PatternError::InvalidConverterPattern { .. }));
    }

    #[test]
    fn test_compiled_parse() {
        let compiled = compile("/items/{id:int}");
        let params = compiled.parse("/items/42").unwrap();
        assert_eq!(params.get("id"), Some(&ParamValue::Int(42)));
        assert!(compiled.parse("/items/abc").is_none());
        assert!(compiled.parse("/items/42/").is_none());
        assert!(compiled.parse("/items").is_none());
        assert!(compiled.parse("/items/42/extra").is_none());
    }

    #[test]
    fn test_prefix_and_suffix() {
        let compiled = compile("/files/{id:int}.json");
        let params = compiled.parse("/files/7.json").unwrap();
        assert_eq!(params.get("id"), Some(&ParamValue::Int(7)));
        assert!(compiled.parse("/files/7.xml").is_none());
        assert_eq!(compiled.render(&params).unwrap(), "/files/7.json");
    }

    #[test]
    fn test_unmarked_greedy_converter_stays_in_segment() {
        let compiled = compile("/{path:rest_string}");
        assert!(compiled.parse("/a").is_some());
        assert!(compiled.parse("/a/b").is_none());
    }

    #[test]
    fn test_forced_wildcard_over_segment_converter() {
        let compiled = compile("/{path:*default}");
        let params = compiled.parse("/a/b/c").unwrap();
        assert_eq!(params.get("path"), Some(&ParamValue::Str("a/b/c".into())));

        let ints = compile("/{n:*int}");
        assert!(ints.parse("/12").is_some());
        // "1/2" matches the repeated pattern but is not one integer.
        assert!(ints.parse("/1/2").is_none());
    }

    #[test]
    fn test_render() {
        let pattern = RoutePattern::parse("/items/{id:int}/").unwrap();
        let params: PathParams = [("id", ParamValue::Int(5))].into_iter().collect();
        assert_eq!(pattern.render(&params).unwrap(), "/items/5/");

        let root = RoutePattern::parse("/").unwrap();
        assert_eq!(root.render(&PathParams::new()).unwrap(), "/");
    }

    #[test]
    fn test_render_errors() {
        let pattern = RoutePattern::parse("/items/{id}").unwrap();
        assert_eq!(
            pattern.render(&PathParams::new()).unwrap_err(),
            RenderError::MissingParam("id".into())
        );
        let params: PathParams = [("id", ParamValue::from("a/b"))].into_iter().collect();
        assert_eq!(
            pattern.render(&params).unwrap_err(),
            RenderError::SeparatorInValue("id".into())
        );

        let compiled = compile("/items/{id:int}");
        let params: PathParams = [("id", ParamValue::from("abc"))].into_iter().collect();
        assert!(matches!(
            compiled.render(&params).unwrap_err(),
            RenderError::Rejected { .. }
        ));
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path(""), (vec![], SlashVariant::WithoutSlash));
        assert_eq!(split_path("/"), (vec![], SlashVariant::WithoutSlash));
        assert_eq!(split_path("/a"), (vec!["a"], SlashVariant::WithoutSlash));
        assert_eq!(split_path("/a/b"), (vec!["a", "b"], SlashVariant::WithoutSlash));
        assert_eq!(split_path("/a/b/"), (vec!["a", "b"], SlashVariant::WithSlash));
        assert_eq!(split_path("/a//b"), (vec!["a", "", "b"], SlashVariant::WithoutSlash));
    }

    #[test]
    fn test_segments_serialize_for_export() {
        let pattern = RoutePattern::parse("/tag/{name}").unwrap();
        let json = serde_json::to_value(pattern.segments()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"kind": "literal", "text": "tag"},
                {"kind": "dynamic", "name": "name", "converter": "default"},
            ])
        );
    }
}
