//! Arena-backed namespace tree built from classified identifiers.

use std::fmt;

use generational_arena::{Arena, Index};
use serde::ser::{Serialize, SerializeMap, Serializer};
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::classify::{classify, Classification, Classified};
use crate::domain::identifier::Identifier;

/// Key under which a module's own package declaration appears in the
/// mapping view.
pub const SELF_KEY: &str = "self";

/// One namespace level.
#[derive(Debug, Clone)]
pub struct NamespaceNode {
    /// Segment name; empty for the root
    pub name: String,
    /// Package declared at exactly this path, if any
    pub package: Option<Identifier>,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Child indices in insertion order
    pub children: Vec<Index>,
}

impl NamespaceNode {
    fn new(name: &str, parent: Option<Index>) -> Self {
        Self {
            name: name.to_string(),
            package: None,
            parent,
            children: Vec::new(),
        }
    }

    /// A declared package without nested namespaces.
    pub fn is_leaf_package(&self) -> bool {
        self.children.is_empty() && self.package.is_some()
    }
}

impl fmt::Display for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{} ({})", self.name, package),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Namespace hierarchy of all declared packages.
///
/// Every node lives in the arena exactly once and is referenced by exactly
/// one parent, so the structure is always a pure tree.
#[derive(Debug)]
pub struct NamespaceTree {
    arena: Arena<NamespaceNode>,
    root: Index,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(NamespaceNode::new("", None));
        Self { arena, root }
    }

    /// Build the tree from a sorted, filtered identifier sequence.
    #[instrument(level = "debug", skip_all, fields(count = identifiers.len()))]
    pub fn build(identifiers: &[Identifier]) -> Self {
        Self::from_classified(&classify(identifiers))
    }

    /// Build the tree from an already classified sequence.
    ///
    /// Leaves are inserted first, then the `self` declarations of parents,
    /// each pass in sequence order. Duplicates are skipped.
    pub fn from_classified(classified: &[Classified]) -> Self {
        let mut tree = Self::new();

        for item in classified
            .iter()
            .filter(|c| c.class == Classification::Leaf)
        {
            tree.declare(&item.identifier);
        }
        for item in classified
            .iter()
            .filter(|c| c.class == Classification::Parent)
        {
            tree.declare(&item.identifier);
        }

        debug!(
            "namespace tree: {} nodes, depth {}",
            tree.len(),
            tree.depth()
        );
        tree
    }

    /// Walk the identifier's segments from the root, creating missing levels,
    /// and record the declaration on the final node.
    ///
    /// Declaring the same identifier twice is a no-op (last write wins).
    #[instrument(level = "trace", skip(self))]
    pub fn declare(&mut self, identifier: &Identifier) -> Index {
        let mut current = self.root;
        for segment in identifier.segments() {
            current = match self.child_named(current, segment) {
                Some(child) => child,
                None => self.insert_child(current, segment),
            };
        }
        if let Some(node) = self.arena.get_mut(current) {
            node.package = Some(identifier.clone());
        }
        current
    }

    fn child_named(&self, parent: Index, name: &str) -> Option<Index> {
        self.arena[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.arena[child].name == name)
    }

    fn insert_child(&mut self, parent: Index, name: &str) -> Index {
        let idx = self.arena.insert(NamespaceNode::new(name, Some(parent)));
        self.arena[parent].children.push(idx);
        idx
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn node(&self, idx: Index) -> Option<&NamespaceNode> {
        self.arena.get(idx)
    }

    /// Children of a node in insertion order.
    pub fn children(&self, idx: Index) -> impl Iterator<Item = &NamespaceNode> + '_ {
        self.arena
            .get(idx)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(|&child| self.arena.get(child))
    }

    /// Look up the node at a segment path (empty path yields the root).
    pub fn find(&self, path: &[&str]) -> Option<&NamespaceNode> {
        let mut current = self.root;
        for segment in path {
            current = self.child_named(current, segment)?;
        }
        self.arena.get(current)
    }

    /// Number of namespace levels below the root.
    pub fn len(&self) -> usize {
        self.arena.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest segment path, which equals the maximum identifier depth.
    pub fn depth(&self) -> usize {
        self.depth_below(self.root)
    }

    fn depth_below(&self, idx: Index) -> usize {
        self.arena[idx]
            .children
            .iter()
            .map(|&child| 1 + self.depth_below(child))
            .max()
            .unwrap_or(0)
    }

    /// Pre-order traversal starting at the root.
    pub fn iter(&self) -> NamespaceIter<'_> {
        NamespaceIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// All declared packages in pre-order.
    pub fn declared_packages(&self) -> Vec<&Identifier> {
        self.iter().filter_map(|node| node.package.as_ref()).collect()
    }

    /// Render as a terminal tree.
    pub fn to_termtree(&self, root_label: &str) -> Tree<String> {
        fn build(tree: &NamespaceTree, idx: Index, parent: &mut Tree<String>) {
            for &child_idx in &tree.arena[idx].children {
                let mut child = Tree::new(tree.arena[child_idx].to_string());
                build(tree, child_idx, &mut child);
                parent.push(child);
            }
        }

        let mut root = Tree::new(root_label.to_string());
        build(self, self.root, &mut root);
        root
    }

    /// Mapping view of a subtree, serializable with serde.
    pub fn mapping(&self, idx: Index) -> MappingView<'_> {
        MappingView { tree: self, idx }
    }
}

pub struct NamespaceIter<'a> {
    tree: &'a NamespaceTree,
    stack: Vec<Index>,
}

impl<'a> Iterator for NamespaceIter<'a> {
    type Item = &'a NamespaceNode;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = self.tree.arena.get(idx)?;
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Nested-mapping view of a namespace node.
///
/// A declared package without children serializes as its identifier string;
/// any other node serializes as a map of its children (insertion order),
/// followed by a `self` entry when the node declares a package.
pub struct MappingView<'a> {
    tree: &'a NamespaceTree,
    idx: Index,
}

impl Serialize for MappingView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.tree.arena[self.idx];
        if node.parent.is_some() && node.children.is_empty() {
            if let Some(package) = &node.package {
                return serializer.serialize_str(package.as_str());
            }
        }

        let extra = usize::from(node.package.is_some());
        let mut map = serializer.serialize_map(Some(node.children.len() + extra))?;
        for &child in &node.children {
            map.serialize_entry(&self.tree.arena[child].name, &self.tree.mapping(child))?;
        }
        if let Some(package) = &node.package {
            map.serialize_entry(SELF_KEY, package.as_str())?;
        }
        map.end()
    }
}

impl Serialize for NamespaceTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.mapping(self.root).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(raw: &[&str]) -> NamespaceTree {
        let ids: Vec<_> = raw.iter().map(|s| Identifier::parse(s).unwrap()).collect();
        NamespaceTree::build(&ids)
    }

    fn package_at(tree: &NamespaceTree, path: &[&str]) -> Option<String> {
        tree.find(path)
            .and_then(|node| node.package.as_ref())
            .map(|p| p.to_string())
    }

    #[test]
    fn given_independent_names_when_building_then_one_leaf_each() {
        let tree = build(&["a.b", "a.c", "d"]);
        assert_eq!(package_at(&tree, &["a", "b"]).as_deref(), Some("a.b"));
        assert_eq!(package_at(&tree, &["a", "c"]).as_deref(), Some("a.c"));
        assert_eq!(package_at(&tree, &["d"]).as_deref(), Some("d"));
        assert!(tree.find(&["a"]).unwrap().package.is_none());
        assert_eq!(tree.declared_packages().len(), 3);
    }

    #[test]
    fn given_prefix_relation_when_building_then_parent_declares_self() {
        let tree = build(&["a.b", "a.b.c"]);
        let b = tree.find(&["a", "b"]).unwrap();
        assert_eq!(b.package.as_ref().unwrap().as_str(), "a.b");
        assert_eq!(b.children.len(), 1);
        assert!(tree.find(&["a", "b", "c"]).unwrap().is_leaf_package());
    }

    #[test]
    fn given_redeclaration_when_declaring_then_node_is_reused() {
        let mut tree = build(&["a.b"]);
        let id = Identifier::parse("a.b").unwrap();
        let first = tree.declare(&id);
        let second = tree.declare(&id);
        assert_eq!(first, second);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn given_leaf_then_descendant_when_declaring_then_leaf_becomes_module() {
        let mut tree = NamespaceTree::new();
        tree.declare(&Identifier::parse("a").unwrap());
        tree.declare(&Identifier::parse("a.b").unwrap());
        let a = tree.find(&["a"]).unwrap();
        assert_eq!(a.package.as_ref().unwrap().as_str(), "a");
        assert!(!a.is_leaf_package());
    }

    #[test]
    fn given_tree_when_measuring_depth_then_matches_longest_identifier() {
        assert_eq!(build(&["a", "b.c.d", "b.e"]).depth(), 3);
        assert_eq!(NamespaceTree::new().depth(), 0);
        assert!(NamespaceTree::new().is_empty());
    }

    #[test]
    fn given_tree_when_iterating_then_pre_order_with_insertion_order() {
        let tree = build(&["a.b", "a.c", "d"]);
        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["", "a", "b", "c", "d"]);
    }

    #[test]
    fn given_tree_when_drawing_then_labels_packages() {
        let drawn = build(&["a", "a.b"]).to_termtree("crate").to_string();
        assert!(drawn.starts_with("crate\n"));
        assert!(drawn.contains("a (a)"));
        assert!(drawn.contains("b (a.b)"));
    }

    #[test]
    fn given_tree_when_serializing_then_self_follows_children() {
        let tree = build(&["a", "a.b", "c"]);
        let rendered = toml::to_string(&tree).unwrap();
        assert!(rendered.contains("c = \"c\""), "{rendered}");
        assert!(rendered.contains("b = \"a.b\""), "{rendered}");
        assert!(rendered.contains("self = \"a\""), "{rendered}");
    }
}
