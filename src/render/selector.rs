//! Tab selection by include/exclude lists.

use serde::{Deserialize, Serialize};

// ============================================================================
// Selection
// ============================================================================

/// Include/exclude criteria for tab identifiers.
///
/// | `include` | `exclude` | Passes |
/// |-----------|-----------|--------|
/// | `None` or empty | `None` | every tab |
/// | non-empty | any | listed tabs only |
/// | any | `Some(list)` | tabs not in `list` |
///
/// The exclude list always wins over the include list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Allow-list. Absent or empty means no filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    /// Deny-list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl Selection {
    /// Creates a selection that passes every tab.
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the allow-list.
    #[must_use]
    pub fn include<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the deny-list.
    #[must_use]
    pub fn exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `id` passes both lists.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        let included = match &self.include {
            Some(list) if !list.is_empty() => list.iter().any(|s| s == id),
            _ => true,
        };
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|list| list.iter().any(|s| s == id));

        included && !excluded
    }
}

// ============================================================================
// select
// ============================================================================

/// Filters `ids` through `selection`, keeping input order.
#[must_use]
pub fn select<S: AsRef<str>>(ids: &[S], selection: &Selection) -> Vec<String> {
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| selection.matches(id))
        .map(str::to_owned)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn ids() -> Vec<&'static str> {
        vec!["A", "B", "C", "D", "E"]
    }

    #[test]
    fn test_no_criteria_passes_all() {
        assert_eq!(select(&ids(), &Selection::all()), ids());
    }

    #[test]
    fn test_empty_include_passes_all() {
        let sel = Selection::all().include(Vec::<String>::new());
        assert_eq!(select(&ids(), &sel), ids());
    }

    #[test]
    fn test_include_is_strict_filter() {
        let sel = Selection::all().include(["D", "B", "Z"]);
        assert_eq!(select(&ids(), &sel), vec!["B", "D"]);
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let sel = Selection::all().include(["A", "C"]).exclude(["C"]);
        assert_eq!(select(&ids(), &sel), vec!["A"]);
    }

    #[test]
    fn test_exclude_only() {
        let sel = Selection::all().exclude(["A", "E"]);
        assert_eq!(select(&ids(), &sel), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let sel: Selection =
            serde_json::from_str(r#"{"include":["A"],"exclude":[]}"#).expect("parse");
        assert_eq!(sel.include.as_deref(), Some(&["A".to_string()][..]));
        assert_eq!(sel.exclude.as_deref(), Some(&[][..]));
    }

    fn id_strategy() -> impl Strategy<Value = String> {
        "[a-e]{1,2}"
    }

    proptest! {
        #[test]
        fn test_select_is_ordered_subset(
            all in prop::collection::vec(id_strategy(), 0..20),
            include in prop::option::of(prop::collection::vec(id_strategy(), 0..5)),
            exclude in prop::option::of(prop::collection::vec(id_strategy(), 0..5)),
        ) {
            let selection = Selection { include, exclude };
            let picked = select(&all, &selection);

            // Every pick satisfies the predicate.
            for id in &picked {
                prop_assert!(selection.matches(id));
            }

            // Order-preserving subsequence of the input.
            let mut rest = all.iter();
            for id in &picked {
                prop_assert!(rest.any(|candidate| candidate == id));
            }

            // Nothing that matches was dropped.
            let expected = all.iter().filter(|id| selection.matches(id)).count();
            prop_assert_eq!(picked.len(), expected);
        }
    }
}
