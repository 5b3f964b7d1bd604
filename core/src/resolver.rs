//! Repository reference resolution.
//!
//! Callers hand us one of three identifier shapes: a bare repository name,
//! a `project/name` path, or a canonical GUID. The backend accepts the
//! latter two; bare names are scoped with the configured project. Pure
//! string work, no I/O; a repository that does not exist surfaces later as
//! `NotFound` from the backend.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Canonical 8-4-4-4-12 hyphenated hex identifier.
static GUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new("^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("static pattern is valid")
});

/// The three identifier shapes a caller may supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoRef<'a> {
    /// Already scoped as `project/name`; used as-is.
    Scoped(&'a str),
    /// Canonical GUID; used as-is.
    Guid(&'a str),
    /// Bare repository name; needs the current project as scope.
    Bare(&'a str),
}

impl<'a> RepoRef<'a> {
    /// Classify an identifier. Checked in order: separator, GUID pattern,
    /// bare fallback.
    pub fn classify(input: &'a str) -> Self {
        if input.contains('/') {
            Self::Scoped(input)
        } else if GUID_PATTERN.is_match(input) {
            Self::Guid(input)
        } else {
            Self::Bare(input)
        }
    }
}

/// Normalize a repository identifier into the form the backend expects.
///
/// Output is always either the original GUID or a fully scoped
/// `project/name` path; bare names are never returned.
pub fn resolve_repository(input: &str, project: &str) -> String {
    match RepoRef::classify(input) {
        RepoRef::Scoped(s) | RepoRef::Guid(s) => s.to_string(),
        RepoRef::Bare(name) => format!("{project}/{name}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bare_name_gets_project_scope() {
        assert_eq!(resolve_repository("Foo", "Proj"), "Proj/Foo");
    }

    #[test]
    fn scoped_path_is_unchanged() {
        assert_eq!(resolve_repository("Proj/Foo", "X"), "Proj/Foo");
    }

    #[test]
    fn guid_is_unchanged() {
        let guid = "a1b2c3d4-e5f6-7890-abcd-ef1234567890";
        assert_eq!(resolve_repository(guid, "X"), guid);
        assert_eq!(
            resolve_repository(&guid.to_uppercase(), "X"),
            guid.to_uppercase()
        );
    }

    #[test]
    fn separator_wins_over_guid_shape() {
        // A scoped path whose name happens to look like a GUID stays scoped.
        let input = "Proj/a1b2c3d4-e5f6-7890-abcd-ef1234567890";
        assert_eq!(RepoRef::classify(input), RepoRef::Scoped(input));
    }

    #[test]
    fn near_guid_is_bare() {
        // Wrong group lengths fail the pattern and fall through to bare.
        let input = "a1b2c3d4-e5f6-7890-abcd-ef12345678";
        assert_eq!(resolve_repository(input, "Proj"), format!("Proj/{input}"));
    }
}
