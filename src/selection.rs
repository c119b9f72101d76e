//! Parsing of user selection expressions such as `1,3,5-7` or `all`

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::grouping::ContentGroup;

/// A deduplicated, ascending set of 1-based group indices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    /// Select every one of `count` groups
    pub fn all(count: usize) -> Self {
        Self {
            indices: (1..=count).collect(),
        }
    }

    /// Parse a selection expression, failing on the first malformed token
    ///
    /// Tokens are comma separated; each is an index `i` or an inclusive range
    /// `a-b`. An empty expression or `all` selects everything. Indices outside
    /// `1..=count` are dropped.
    pub fn parse(raw: &str, count: usize) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(Self::all(count));
        }

        let mut indices = BTreeSet::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (start, end) = parse_token(token)?;
            // Clamp before iterating; user bounds may be arbitrarily large
            let (lo, hi) = (start.max(1), end.min(count));
            if lo <= hi {
                indices.extend(lo..=hi);
            }
        }
        Ok(Self { indices })
    }

    /// Parse a selection expression, selecting everything if it is malformed
    ///
    /// This is the interactive default: a typo downloads all groups instead of
    /// aborting the run.
    pub fn parse_or_all(raw: &str, count: usize) -> Self {
        match Self::parse(raw, count) {
            Ok(selection) => selection,
            Err(e) => {
                tracing::warn!(input = raw, error = %e, "Invalid selection, selecting all groups");
                Self::all(count)
            }
        }
    }

    /// Selected indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Number of selected groups
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was selected
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Pick the selected groups, preserving the groups' own order
    pub fn apply<'a>(&self, groups: &'a [ContentGroup]) -> Vec<&'a ContentGroup> {
        self.indices()
            .filter_map(|i| groups.get(i.wrapping_sub(1)))
            .collect()
    }
}

fn parse_token(token: &str) -> Result<(usize, usize)> {
    let malformed = || Error::Selection {
        token: token.to_string(),
    };
    let number = |s: &str| s.trim().parse::<usize>().map_err(|_| malformed());

    match token.split_once('-') {
        Some((a, b)) => Ok((number(a)?, number(b)?)),
        None => {
            let i = number(token)?;
            Ok((i, i))
        }
    }
}
