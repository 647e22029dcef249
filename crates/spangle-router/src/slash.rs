//! Trailing-slash policies.
//!
//! | policy | `/route` bound, `/route/` requested | `/route/` bound, `/route` requested |
//! |---|---|---|
//! | `no_slash` | redirect 308 to `/route` | served (canonical form is `/route`) |
//! | `slash` | served (canonical form is `/route/`) | redirect 308 to `/route/` |
//! | `strict` | not found | not found |
//! | `clone` | same handler | same handler |
//!
//! Policies are applied when a route is inserted: each one decides which
//! [`SlashVariant`] slots of the terminal trie node receive a binding, and of
//! what [`BindingKind`]. Lookup then only has to read the slot for the
//! requested variant and [`resolve`] it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status code used for trailing-slash redirects.
pub const PERMANENT_REDIRECT: u16 = 308;

/// How `/route` and `/route/` relate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingSlash {
    /// Canonical form has no trailing slash; `/route/` redirects.
    #[default]
    NoSlash,
    /// Canonical form has a trailing slash; `/route` redirects.
    Slash,
    /// The two forms are distinct routes.
    Strict,
    /// One registration serves both forms.
    Clone,
}

impl TrailingSlash {
    /// Returns the policy's configuration name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSlash => "no_slash",
            Self::Slash => "slash",
            Self::Strict => "strict",
            Self::Clone => "clone",
        }
    }

    /// The slots a route spelled with `spelled` occupies under this policy.
    ///
    /// The first entry is the explicit binding; any further entry is an
    /// implicit twin that yields to explicit registrations.
    pub(crate) fn plan(self, spelled: SlashVariant) -> Vec<(SlashVariant, BindingKind)> {
        use SlashVariant::{WithSlash, WithoutSlash};
        match self {
            Self::Strict => vec![(spelled, BindingKind::Serve)],
            Self::Clone => vec![(spelled, BindingKind::Serve), (spelled.other(), BindingKind::Serve)],
            Self::NoSlash => vec![
                (WithoutSlash, BindingKind::Serve),
                (WithSlash, BindingKind::RedirectStripSlash),
            ],
            Self::Slash => vec![
                (WithSlash, BindingKind::Serve),
                (WithoutSlash, BindingKind::RedirectAddSlash),
            ],
        }
    }
}

impl fmt::Display for TrailingSlash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrailingSlash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_slash" => Ok(Self::NoSlash),
            "slash" => Ok(Self::Slash),
            "strict" => Ok(Self::Strict),
            "clone" => Ok(Self::Clone),
            other => Err(format!("unknown trailing-slash policy `{other}`")),
        }
    }
}

/// Whether a path ends with a separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashVariant {
    /// `/route/`
    WithSlash,
    /// `/route` (and the root `/`)
    WithoutSlash,
}

impl SlashVariant {
    /// The opposite variant.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::WithSlash => Self::WithoutSlash,
            Self::WithoutSlash => Self::WithSlash,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::WithoutSlash => 0,
            Self::WithSlash => 1,
        }
    }
}

/// What a bound slot does when it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    /// Serve the route's handler.
    Serve,
    /// Redirect to the same path minus its trailing separator.
    RedirectStripSlash,
    /// Redirect to the same path plus a trailing separator.
    RedirectAddSlash,
}

/// Outcome of applying a slot's policy to a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Serve the handler; the variant that was requested.
    Serve(SlashVariant),
    /// Redirect to `location` with `status`.
    Redirect { location: String, status: u16 },
    /// Nothing is bound for this variant.
    NotFound,
}

/// Resolves a request path against the slot it reached (if any).
///
/// The redirect target adds or strips exactly one trailing separator; a
/// query string is the caller's to re-attach.
///
/// ```
/// use spangle_router::{BindingKind, Resolution, resolve_slash};
///
/// assert_eq!(
///     resolve_slash("/route/", Some(BindingKind::RedirectStripSlash)),
///     Resolution::Redirect { location: "/route".into(), status: 308 },
/// );
/// assert_eq!(resolve_slash("/route", None), Resolution::NotFound);
/// ```
#[must_use]
pub fn resolve(path: &str, slot: Option<BindingKind>) -> Resolution {
    match slot {
        None => Resolution::NotFound,
        Some(BindingKind::Serve) => {
            let variant = if path.len() > 1 && path.ends_with('/') {
                SlashVariant::WithSlash
            } else {
                SlashVariant::WithoutSlash
            };
            Resolution::Serve(variant)
        }
        Some(BindingKind::RedirectStripSlash) => {
            let stripped = path.strip_suffix('/').unwrap_or(path);
            let location = if stripped.is_empty() { "/" } else { stripped };
            Resolution::Redirect {
                location: location.to_owned(),
                status: PERMANENT_REDIRECT,
            }
        }
        Some(BindingKind::RedirectAddSlash) => Resolution::Redirect {
            location: format!("{path}/"),
            status: PERMANENT_REDIRECT,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names_round_trip() {
        for policy in [
            TrailingSlash::NoSlash,
            TrailingSlash::Slash,
            TrailingSlash::Strict,
            TrailingSlash::Clone,
        ] {
            assert_eq!(policy.as_str().parse::<TrailingSlash>().unwrap(), policy);
        }
        assert!("sometimes".parse::<TrailingSlash>().is_err());
        assert_eq!(TrailingSlash::default(), TrailingSlash::NoSlash);
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&TrailingSlash::NoSlash).unwrap();
        assert_eq!(json, "\"no_slash\"");
        let parsed: TrailingSlash = serde_json::from_str("\"clone\"").unwrap();
        assert_eq!(parsed, TrailingSlash::Clone);
    }

    #[test]
    fn test_plans() {
        use SlashVariant::{WithSlash, WithoutSlash};
        assert_eq!(
            TrailingSlash::Strict.plan(WithSlash),
            vec![(WithSlash, BindingKind::Serve)]
        );
        assert_eq!(
            TrailingSlash::Clone.plan(WithoutSlash),
            vec![(WithoutSlash, BindingKind::Serve), (WithSlash, BindingKind::Serve)]
        );
        // The spelled variant does not matter for the normalizing policies.
        assert_eq!(
            TrailingSlash::NoSlash.plan(WithSlash),
            TrailingSlash::NoSlash.plan(WithoutSlash)
        );
        assert_eq!(
            TrailingSlash::Slash.plan(WithoutSlash)[1],
            (WithoutSlash, BindingKind::RedirectAddSlash)
        );
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve("/route", Some(BindingKind::Serve)),
            Resolution::Serve(SlashVariant::WithoutSlash)
        );
        assert_eq!(
            resolve("/route/", Some(BindingKind::Serve)),
            Resolution::Serve(SlashVariant::WithSlash)
        );
        assert_eq!(
            resolve("/route/", Some(BindingKind::RedirectStripSlash)),
            Resolution::Redirect {
                location: "/route".into(),
                status: PERMANENT_REDIRECT
            }
        );
        assert_eq!(
            resolve("/route", Some(BindingKind::RedirectAddSlash)),
            Resolution::Redirect {
                location: "/route/".into(),
                status: PERMANENT_REDIRECT
            }
        );
        assert_eq!(resolve("/route", None), Resolution::NotFound);
    }
}
