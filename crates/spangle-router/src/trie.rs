//! Segment trie.
//!
//! # Algorithm
//!
//! Each node holds three kinds of children:
//!
//! 1. literal children, keyed by exact segment text
//! 2. dynamic children, one segment each, tried in registration order
//! 3. wildcard children, which match all remaining segments at once
//!
//! Lookup tries them in that order and backtracks: a dynamic match that
//! leads to a dead end further down is abandoned and the next candidate is
//! tried. A converter rejecting a segment is just another dead end.
//!
//! Every node has one binding slot per [`SlashVariant`]. The trailing-slash
//! policy of a route decides which slots it fills at insertion time.
//!
//! Dynamic children are keyed by converter and literal framing only, so
//! `/i/{id}` and `/i/{key:str}` share a node (and conflict). Captured values
//! are renamed after the match to the names of the route that was found.
//!
//! Explicit bindings win over implicit trailing-slash twins: lookup first
//! considers explicit bindings only, then falls back to twins.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::converter::{Converter, ConverterRegistry, ConverterScope};
use crate::r#match::{PathParams, RouteLookup, RouteMatch};
use crate::pattern::{CompiledPattern, Matcher, PatternError, RenderError, RoutePattern, split_path};
use crate::slash::{self, BindingKind, Resolution, SlashVariant, TrailingSlash};

/// Two registrations claim the same node and trailing-slash variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route `{pattern}` conflicts with already registered `{existing}`")]
pub struct RouteConflictError {
    /// The pattern being inserted.
    pub pattern: String,
    /// The pattern that already owns the slot.
    pub existing: String,
}

/// Errors returned by [`Router::insert`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Conflict(#[from] RouteConflictError),
}

/// A registered route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteEntry {
    pattern: RoutePattern,
    policy: TrailingSlash,
    #[serde(skip)]
    compiled: CompiledPattern,
}

impl RouteEntry {
    /// The canonical pattern: the form the route is served under.
    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// The trailing-slash policy in effect for this route.
    #[must_use]
    pub fn policy(&self) -> TrailingSlash {
        self.policy
    }

    /// Builds the canonical path for `params`.
    ///
    /// Values are checked against the route's converters, so the result is
    /// guaranteed to route back here.
    pub fn render(&self, params: &PathParams) -> Result<String, RenderError> {
        self.compiled.render(params)
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    kind: BindingKind,
    explicit: bool,
    route: usize,
}

#[derive(Debug)]
struct DynamicChild {
    matcher: Matcher,
    node: Node,
}

#[derive(Debug, Default)]
struct Node {
    literal: HashMap<String, Node>,
    dynamic: Vec<DynamicChild>,
    wildcard: Vec<DynamicChild>,
    bound: [Option<Binding>; 2],
}

impl Node {
    fn child_for(&mut self, matcher: Option<Matcher>, literal: &str, wildcard: bool) -> &mut Node {
        let Some(matcher) = matcher else {
            return self.literal.entry(literal.to_owned()).or_default();
        };
        let children = if wildcard {
            &mut self.wildcard
        } else {
            &mut self.dynamic
        };
        let pos = children.iter().position(|c| {
            let (ours, theirs) = (c.matcher.placeholder(), matcher.placeholder());
            ours.prefix == theirs.prefix
                && ours.suffix == theirs.suffix
                && c.matcher.converter().same_as(matcher.converter())
        });
        let pos = pos.unwrap_or_else(|| {
            children.push(DynamicChild {
                matcher,
                node: Node::default(),
            });
            children.len() - 1
        });
        &mut children[pos].node
    }

    fn bound(&self, variant: SlashVariant, explicit_only: bool) -> Option<Binding> {
        self.bound[variant.index()].filter(|b| b.explicit || !explicit_only)
    }

    fn find(
        &self,
        parts: &[&str],
        variant: SlashVariant,
        explicit_only: bool,
        params: &mut PathParams,
    ) -> Option<Binding> {
        let Some((head, rest)) = parts.split_first() else {
            return self.bound(variant, explicit_only);
        };

        if let Some(found) = self
            .literal
            .get(*head)
            .and_then(|c| c.find(rest, variant, explicit_only, params))
        {
            return Some(found);
        }

        let mark = params.len();
        for child in &self.dynamic {
            if let Some(value) = child.matcher.capture(head) {
                params.push(child.matcher.name(), value);
                if let Some(found) = child.node.find(rest, variant, explicit_only, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if self.wildcard.is_empty() {
            return None;
        }
        let remainder = parts.join("/");
        for child in &self.wildcard {
            let Some(binding) = child.node.bound(variant, explicit_only) else {
                continue;
            };
            if let Some(value) = child.matcher.capture(&remainder) {
                params.push(child.matcher.name(), value);
                return Some(binding);
            }
        }
        None
    }
}

/// Path router.
///
/// Built once, then shared read-only: [`Router::at`] takes `&self` and does
/// no allocation beyond the returned parameters.
pub struct Router<T> {
    root: Node,
    routes: Vec<(RouteEntry, T)>,
    converters: ConverterRegistry,
    policy: TrailingSlash,
}

impl<T> Router<T> {
    /// Creates an empty router with the built-in converters and the
    /// `no_slash` policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(TrailingSlash::default())
    }

    /// Creates an empty router with the given default trailing-slash policy.
    #[must_use]
    pub fn with_policy(policy: TrailingSlash) -> Self {
        Self {
            root: Node::default(),
            routes: Vec::new(),
            converters: ConverterRegistry::with_builtins(),
            policy,
        }
    }

    /// Default policy for routes inserted without an override.
    #[must_use]
    pub fn policy(&self) -> TrailingSlash {
        self.policy
    }

    /// The router-wide converter registry.
    #[must_use]
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Registers (or replaces) a converter for all later insertions.
    pub fn register_converter(&mut self, name: impl Into<String>, converter: Converter) {
        self.converters.register(name, converter);
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&RouteEntry, &T)> {
        self.routes.iter().map(|(entry, value)| (entry, value))
    }

    /// Parses and compiles a template against this router's converters.
    pub fn compile_pattern(
        &self,
        template: &str,
        overrides: &ConverterRegistry,
    ) -> Result<CompiledPattern, PatternError> {
        RoutePattern::parse(template)?.compile(&ConverterScope::new(overrides, &self.converters))
    }

    /// Inserts a route.
    ///
    /// `overrides` shadow router converters for this route only. `slash`
    /// overrides the router's default policy. Returns the canonical pattern
    /// the route is served under.
    ///
    /// # Errors
    ///
    /// Fails on a malformed template, an unknown converter, or when another
    /// route already serves the same node and trailing-slash variant.
    pub fn insert(
        &mut self,
        template: &str,
        value: T,
        overrides: &ConverterRegistry,
        slash: Option<TrailingSlash>,
    ) -> Result<RoutePattern, RouterError> {
        let pattern = RoutePattern::parse(template)?;
        let policy = slash.unwrap_or(self.policy);
        let plan = if pattern.is_root() {
            vec![(SlashVariant::WithoutSlash, BindingKind::Serve)]
        } else {
            policy.plan(pattern.variant())
        };
        let canonical = pattern.with_variant(plan[0].0);
        let compiled = canonical.compile(&ConverterScope::new(overrides, &self.converters))?;
        let route = self.routes.len();

        let (_, matchers) = compiled.clone().into_parts();
        let mut node = &mut self.root;
        for (segment, matcher) in canonical.segments().iter().zip(matchers) {
            let literal = segment.to_string();
            node = node.child_for(matcher, &literal, segment.is_wildcard());
        }

        let (explicit_variant, explicit_kind) = plan[0];
        if let Some(existing) = node.bound[explicit_variant.index()] {
            if existing.explicit {
                return Err(RouteConflictError {
                    pattern: canonical.to_string(),
                    existing: self.routes[existing.route].0.pattern.to_string(),
                }
                .into());
            }
        }
        node.bound[explicit_variant.index()] = Some(Binding {
            kind: explicit_kind,
            explicit: true,
            route,
        });
        for &(variant, kind) in &plan[1..] {
            let slot = &mut node.bound[variant.index()];
            if slot.is_none() {
                *slot = Some(Binding {
                    kind,
                    explicit: false,
                    route,
                });
            }
        }

        tracing::debug!(
            pattern = %canonical,
            policy = %policy,
            route,
            "route inserted"
        );
        let entry = RouteEntry {
            pattern: canonical.clone(),
            policy,
            compiled,
        };
        self.routes.push((entry, value));
        Ok(canonical)
    }

    /// Looks up a request path.
    #[must_use]
    pub fn at(&self, path: &str) -> RouteLookup<'_, T> {
        let (parts, variant) = split_path(path);
        let mut params = PathParams::new();
        let binding = self
            .root
            .find(&parts, variant, true, &mut params)
            .or_else(|| self.root.find(&parts, variant, false, &mut params));

        match slash::resolve(path, binding.map(|b| b.kind)) {
            Resolution::Serve(variant) => {
                let Some((entry, value)) = binding.and_then(|b| self.routes.get(b.route)) else {
                    return RouteLookup::NotFound;
                };
                params.rename(entry.pattern.param_names());
                tracing::trace!(path, pattern = %entry.pattern, "route matched");
                RouteLookup::Match(RouteMatch {
                    value,
                    route: entry,
                    params,
                    variant,
                })
            }
            Resolution::Redirect { location, status } => {
                tracing::trace!(path, %location, "trailing-slash redirect");
                RouteLookup::Redirect { location, status }
            }
            Resolution::NotFound => {
                tracing::trace!(path, "no route matched");
                RouteLookup::NotFound
            }
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.iter().map(|(e, _)| &e.pattern).collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
