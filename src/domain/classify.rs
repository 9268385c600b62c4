//! Adjacency classification of a sorted identifier sequence.

use crate::domain::identifier::Identifier;

/// Role of one identifier in the sorted sequence, decided by its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Equal to its successor; the later instance carries the information.
    Duplicate,
    /// Its successor is a dotted descendant; declared as `self` of a module.
    Parent,
    /// No descendant follows; declared directly.
    Leaf,
}

/// An identifier together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub identifier: Identifier,
    pub class: Classification,
}

/// Counts per classification, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    pub leaves: usize,
    pub parents: usize,
    pub duplicates: usize,
}

/// Classify each identifier against its successor in a single forward pass.
///
/// The input must be sorted lexicographically; it is not modified. The last
/// element has no successor and is always a `Leaf`.
pub fn classify(identifiers: &[Identifier]) -> Vec<Classified> {
    let successors = identifiers.iter().skip(1).map(Some).chain(std::iter::once(None));

    identifiers
        .iter()
        .zip(successors)
        .map(|(current, next)| {
            let class = match next {
                Some(next) if next == current => Classification::Duplicate,
                Some(next) if current.is_parent_of(next) => Classification::Parent,
                _ => Classification::Leaf,
            };
            Classified {
                identifier: current.clone(),
                class,
            }
        })
        .collect()
}

impl ClassificationStats {
    pub fn from_classified(classified: &[Classified]) -> Self {
        classified
            .iter()
            .fold(Self::default(), |mut stats, item| {
                match item.class {
                    Classification::Leaf => stats.leaves += 1,
                    Classification::Parent => stats.parents += 1,
                    Classification::Duplicate => stats.duplicates += 1,
                }
                stats
            })
    }
}
