//! Route matching result.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::converter::ParamValue;
use crate::slash::SlashVariant;
use crate::trie::RouteEntry;

/// Converted path parameters, in template order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    entries: Vec<(String, ParamValue)>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: &str, value: ParamValue) {
        self.entries.push((name.to_owned(), value));
    }

    /// Get a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Renames parameters positionally. Surplus names are ignored.
    pub(crate) fn rename<'n>(&mut self, names: impl Iterator<Item = &'n str>) {
        for ((name, _), new) in self.entries.iter_mut().zip(names) {
            if name != new {
                new.clone_into(name);
            }
        }
    }
}

impl<'a> FromIterator<(&'a str, ParamValue)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (&'a str, ParamValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.to_owned(), v)).collect(),
        }
    }
}

impl Serialize for PathParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A matched route with extracted parameters.
pub struct RouteMatch<'a, T> {
    /// Value bound to the route.
    pub value: &'a T,
    /// The registration that matched.
    pub route: &'a RouteEntry,
    /// Extracted path parameters.
    pub params: PathParams,
    /// Which trailing-slash form was requested.
    pub variant: SlashVariant,
}

impl<T> RouteMatch<'_, T> {
    /// Get a parameter value by name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

impl<T> std::fmt::Debug for RouteMatch<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route)
            .field("params", &self.params)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// Result of attempting to locate a route by path.
#[derive(Debug)]
pub enum RouteLookup<'a, T> {
    /// A route matched and should be served.
    Match(RouteMatch<'a, T>),
    /// The path matched a route in its non-canonical trailing-slash form.
    Redirect { location: String, status: u16 },
    /// No route matched the path.
    NotFound,
}

impl<T> RouteLookup<'_, T> {
    /// Whether this lookup found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
