use std::collections::HashSet;

/// Tracks which folders of the navigation tree are expanded, by folder id.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    expanded: HashSet<String>,
}

impl ExpansionState {
    /// Expand a single folder.
    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    /// Flip a folder between expanded and collapsed. Collapsing also
    /// collapses every descendant.
    pub fn toggle(&mut self, id: &str) {
        if self.is_expanded(id) {
            self.collapse_recursive(id);
        } else {
            self.expand(id);
        }
    }

    /// Remove this folder and all descendants from the expanded set.
    pub fn collapse_recursive(&mut self, id: &str) {
        let descendant_prefix = format!("{}/", id);
        self.expanded
            .retain(|expanded| expanded != id && !expanded.starts_with(&descendant_prefix));
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }
}
