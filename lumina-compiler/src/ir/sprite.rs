//! Sprite-state trees.
//!
//! Each level of the tree is one mutually exclusive choice (`casual` or
//! `school`, then `smile` or `angry`, ...). A state is a root-to-leaf path of
//! node names. Every node remembers its first child as the default, so the
//! first complete path ever declared is the character's default state.

use serde::Serialize;

/// Where the art of a leaf comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRef {
    File(String),
    /// Rendered by the engine's placeholder facility with this label.
    Placeholder { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteNode {
    pub name: String,
    pub asset: Option<AssetRef>,
    pub children: Vec<SpriteNode>,
}

impl SpriteNode {
    fn new(name: &str) -> Self {
        SpriteNode { name: name.to_string(), asset: None, children: Vec::new() }
    }

    fn child(&self, name: &str) -> Option<&SpriteNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteTree {
    roots: Vec<SpriteNode>,
}

impl SpriteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Adds (or re-binds) the state `path`. Returns false for an empty path.
    pub fn insert(&mut self, path: &[String], asset: AssetRef) -> bool {
        let Some((first, rest)) = path.split_first() else { return false };
        let mut level = &mut self.roots;
        let mut node_name = first;
        let mut rest = rest;
        loop {
            let idx = match level.iter().position(|n| &n.name == node_name) {
                Some(i) => i,
                None => {
                    level.push(SpriteNode::new(node_name));
                    level.len() - 1
                }
            };
            let node = &mut level[idx];
            match rest.split_first() {
                Some((next, tail)) => {
                    node_name = next;
                    rest = tail;
                    level = &mut node.children;
                }
                None => {
                    node.asset = Some(asset);
                    return true;
                }
            }
        }
    }

    fn node_at(&self, path: &[String]) -> Option<&SpriteNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.iter().find(|n| &n.name == first)?;
        for name in rest {
            node = node.child(name)?;
        }
        Some(node)
    }

    fn children_at(&self, prefix: &[String]) -> Option<&[SpriteNode]> {
        if prefix.is_empty() {
            Some(&self.roots)
        } else {
            self.node_at(prefix).map(|n| n.children.as_slice())
        }
    }

    /// Extends `path` along default children until it reaches a leaf.
    fn descend(&self, path: &mut Vec<String>) {
        while let Some(first) = self.children_at(path).and_then(|c| c.first()) {
            path.push(first.name.clone());
        }
    }

    pub fn default_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        self.descend(&mut path);
        path
    }

    /// True if `path` ends on a leaf of the tree.
    pub fn is_complete(&self, path: &[String]) -> bool {
        self.node_at(path).is_some_and(SpriteNode::is_leaf)
    }

    /// Applies `tags` on top of `current`. A tag replaces the choice at the
    /// shallowest level where it names a sibling of the current path; levels
    /// below it fall back to their defaults. `None` if a tag matches nothing.
    pub fn resolve(&self, current: &[String], tags: &[String]) -> Option<Vec<String>> {
        let mut path = current.to_vec();
        if !self.is_complete(&path) {
            path = self.default_path();
        }
        for tag in tags {
            let depth = (0..=path.len()).find(|&d| {
                self.children_at(&path[..d.min(path.len())])
                    .is_some_and(|cs| cs.iter().any(|c| &c.name == tag))
            })?;
            path.truncate(depth);
            path.push(tag.clone());
            self.descend(&mut path);
        }
        Some(path)
    }

    /// Every node carrying an asset and every leaf, depth first, with its path.
    pub fn images(&self) -> Vec<(Vec<String>, Option<&AssetRef>)> {
        fn walk<'t>(node: &'t SpriteNode, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, Option<&'t AssetRef>)>) {
            prefix.push(node.name.clone());
            if node.asset.is_some() || node.is_leaf() {
                out.push((prefix.clone(), node.asset.as_ref()));
            }
            for c in &node.children {
                walk(c, prefix, out);
            }
            prefix.pop();
        }
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        for r in &self.roots {
            walk(r, &mut prefix, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn tree() -> SpriteTree {
        let mut t = SpriteTree::new();
        for path in ["casual smile", "casual angry", "school smile", "school cry"] {
            t.insert(&p(path), AssetRef::File(format!("{}.png", path.replace(' ', "_"))));
        }
        t
    }

    #[test]
    fn first_declared_path_is_default() {
        assert_eq!(tree().default_path(), p("casual smile"));
        assert!(SpriteTree::new().default_path().is_empty());
    }

    #[test]
    fn tags_resolve_against_current_state() {
        let t = tree();
        assert_eq!(t.resolve(&p("casual smile"), &p("angry")), Some(p("casual angry")));
        assert_eq!(t.resolve(&p("casual angry"), &p("school")), Some(p("school smile")));
        assert_eq!(t.resolve(&p("casual angry"), &p("school cry")), Some(p("school cry")));
        assert_eq!(t.resolve(&[], &[]), Some(p("casual smile")));
        assert_eq!(t.resolve(&p("casual smile"), &p("dance")), None);
    }

    #[test]
    fn extending_a_leaf_keeps_its_asset() {
        let mut t = SpriteTree::new();
        t.insert(&p("casual"), AssetRef::File("c.png".into()));
        t.insert(&p("casual blush"), AssetRef::Placeholder { text: "blush".into() });
        assert_eq!(t.default_path(), p("casual blush"));
        assert_eq!(t.images().len(), 2);
    }
}
