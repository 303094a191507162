/// Filtering, sorting and category derivation over a result set
use crate::videos::VideoGroup;
use anyhow::anyhow;
use feruca::Collator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Label of the catch-all category filter
pub const ALL_CATEGORIES: &str = "all";

/// Which groups the view keeps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Exact, case-sensitive category match
    Only(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        if value == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Only(value.to_string())
        }
    }

    pub fn matches(&self, group: &VideoGroup) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => group.category.as_deref() == Some(category.as_str()),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_CATEGORIES),
            Self::Only(category) => f.write_str(category),
        }
    }
}

/// Display order of the result list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most popular first
    #[default]
    Popularity,
    /// Most recent first
    Date,
    /// Alphabetical
    Title,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Popularity, SortKey::Date, SortKey::Title];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popularity => "popularity",
            Self::Date => "date",
            Self::Title => "title",
        }
    }

    fn compare(&self, a: &VideoGroup, b: &VideoGroup, collator: &mut Collator) -> Ordering {
        match self {
            Self::Popularity => b.popularity_score().total_cmp(&a.popularity_score()),
            Self::Date => b.upload_instant().cmp(&a.upload_instant()),
            Self::Title => collator.collate(a.title.as_str(), b.title.as_str()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown sort order {:?} (expected popularity, date or title)", s))
    }
}

/// Title collation: Unicode collation with CLDR root rules, which gives the
/// usual English order. Accents and case only break ties, and lowercase
/// sorts before uppercase.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    Collator::default().collate(a, b)
}

/// The groups to display, in display order. Recomputed on every call and
/// never mutates `groups`.
pub fn filter_and_sort<'a>(
    groups: &'a [VideoGroup],
    filter: &CategoryFilter,
    sort: SortKey,
) -> Vec<&'a VideoGroup> {
    let mut visible: Vec<&VideoGroup> = groups.iter().filter(|g| filter.matches(g)).collect();
    // stable: equal keys keep response order
    let mut collator = Collator::default();
    visible.sort_by(|a, b| sort.compare(a, b, &mut collator));
    visible
}

/// "all" followed by every distinct non-empty category in first-seen order.
pub fn categories(groups: &[VideoGroup]) -> Vec<CategoryFilter> {
    let mut found = vec![CategoryFilter::All];
    for category in groups
        .iter()
        .filter_map(|g| g.category.as_deref())
        .filter(|c| !c.is_empty())
    {
        let candidate = CategoryFilter::Only(category.to_string());
        if !found.contains(&candidate) {
            found.push(candidate);
        }
    }
    found
}
