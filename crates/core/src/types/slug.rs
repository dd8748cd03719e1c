//! URL slugs derived from store names.
//!
//! A slug is computed from a display name and then disambiguated against the
//! slugs already in use: when `n` existing stores match `^(base)(-[0-9]*)?$`
//! (case-insensitive), the new slug becomes `base-{n + 1}`.
//!
//! ```
//! use storefinder_core::Slug;
//!
//! let base = Slug::from_name("Cafe One");
//! assert_eq!(base.as_str(), "cafe-one");
//! assert_eq!(base.disambiguate(0).as_str(), "cafe-one");
//! assert_eq!(base.disambiguate(1).as_str(), "cafe-one-2");
//! ```

use core::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Slug used when a name contains nothing slug-worthy (e.g. only punctuation).
const FALLBACK_SLUG: &str = "store";

/// A lowercase, hyphenated, URL-safe identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive the base slug for a display name.
    ///
    /// Letters and digits are lowercased and kept, runs of whitespace, `-`
    /// and `_` collapse into a single hyphen, and all other characters are
    /// dropped.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_separator = false;

        for c in name.chars() {
            if c.is_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.extend(c.to_lowercase());
            } else if c.is_whitespace() || c == '-' || c == '_' {
                pending_separator = true;
            }
        }

        if slug.is_empty() {
            return Self(FALLBACK_SLUG.to_owned());
        }

        Self(slug)
    }

    /// Wrap a slug read back from storage without re-deriving it.
    #[must_use]
    pub const fn from_stored(slug: String) -> Self {
        Self(slug)
    }

    /// Append `-{matches + 1}` when `matches` existing stores already use
    /// this base slug (or a numbered variant of it).
    #[must_use]
    pub fn disambiguate(&self, matches: usize) -> Self {
        if matches == 0 {
            return self.clone();
        }
        Self(format!("{}-{}", self.0, matches + 1))
    }

    /// Pattern matching this slug and its numbered variants.
    #[must_use]
    pub fn collision_pattern(&self) -> SlugPattern {
        SlugPattern::for_base(self)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the slug and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The collision pattern `^(base)(-[0-9]*)?$` for a base slug.
///
/// The same source string is understood by Rust's `regex` crate and by
/// `PostgreSQL`'s `~*` operator, so repositories can either push it into SQL
/// or evaluate it in memory.
#[derive(Debug, Clone)]
pub struct SlugPattern {
    source: String,
}

impl SlugPattern {
    fn for_base(base: &Slug) -> Self {
        // Derived slugs hold only letters, digits and hyphens, none of which
        // are metacharacters outside a bracket expression.
        Self {
            source: format!("^({base})(-[0-9]*)?$"),
        }
    }

    /// The pattern source, without case-insensitivity flags.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compile the pattern for in-process, case-insensitive matching.
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if compilation fails, which cannot happen for
    /// patterns built from a derived slug.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!("(?i){}", self.source))
    }

    /// Count how many of `slugs` collide with the base slug.
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if the pattern fails to compile.
    pub fn count_matches<'a>(
        &self,
        slugs: impl IntoIterator<Item = &'a str>,
    ) -> Result<usize, regex::Error> {
        let re = self.compile()?;
        Ok(slugs.into_iter().filter(|s| re.is_match(s)).count())
    }
}
