/*
 * k-CFA Call Strings
 *
 * A context is the ordered sequence of the last K call sites on the path
 * that reached a function. Pushing a new site trims from the front so the
 * length never exceeds K. The empty string is the initial context.
 */

use crate::shared::models::ir::InstId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Bounded call string. K is enforced by `push`, not by the type, so the
/// depth can be a runtime configuration option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CallString {
    sites: SmallVec<[InstId; 4]>,
}

impl CallString {
    /// The initial (empty) context.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append `site`, keeping only the last `k` sites. With `k == 0` the
    /// result is always the root context (context-insensitive analysis).
    pub fn push(&self, site: InstId, k: usize) -> Self {
        let mut sites = self.sites.clone();
        sites.push(site);
        while sites.len() > k {
            sites.remove(0);
        }
        Self { sites }
    }

    /// Context with the most recent call site dropped.
    pub fn tail(&self) -> Self {
        let mut sites = self.sites.clone();
        if !sites.is_empty() {
            sites.remove(0);
        }
        Self { sites }
    }

    pub fn is_root(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[InstId] {
        &self.sites
    }
}

impl fmt::Display for CallString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sites.is_empty() {
            return write!(f, "@root");
        }
        write!(f, "@cs")?;
        for site in &self.sites {
            write!(f, ":{}", site.0)?;
        }
        Ok(())
    }
}
