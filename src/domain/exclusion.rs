//! Denylist filtering of identifiers before tree construction.

use tracing::debug;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identifier::Identifier;

/// Removes a fixed set of identifiers from the discovery output.
///
/// The denylist is a precondition on the discovery data: every entry must be
/// present, otherwise the filter fails instead of silently passing through.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    denylist: Vec<Identifier>,
}

impl ExclusionFilter {
    pub fn new(denylist: Vec<Identifier>) -> Self {
        Self { denylist }
    }

    /// Parse denylist entries from configuration strings.
    pub fn from_strings<S: AsRef<str>>(entries: &[S]) -> DomainResult<Self> {
        let denylist = entries
            .iter()
            .map(|entry| Identifier::parse(entry.as_ref()))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self::new(denylist))
    }

    /// Remove every occurrence of every denylisted identifier, keeping the
    /// relative order of the remainder.
    pub fn apply(&self, identifiers: Vec<Identifier>) -> DomainResult<Vec<Identifier>> {
        if let Some(missing) = self
            .denylist
            .iter()
            .find(|excluded| !identifiers.contains(excluded))
        {
            return Err(DomainError::ExcludedPackageMissing(missing.to_string()));
        }

        let before = identifiers.len();
        let kept: Vec<Identifier> = identifiers
            .into_iter()
            .filter(|id| !self.denylist.contains(id))
            .collect();
        debug!(
            "exclusion: removed {} of {} identifiers",
            before - kept.len(),
            before
        );
        Ok(kept)
    }
}
