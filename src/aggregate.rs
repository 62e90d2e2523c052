//! Memoized flattening of the report tree.
//!
//! For any node, the aggregation is the list of all files and datablocks
//! beneath it. Results hold arena handles into the [`ReportTree`], never
//! copies of the records, and are computed at most once per node because
//! the tree is immutable after construction.

use indextree::NodeId;
use std::collections::HashMap;

use crate::report::{DataBlock, FileRecord};
use crate::tree::{ReportNode, ReportTree};

/// Handle to a datablock: owning file node plus index in its block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub file: NodeId,
    pub index: usize,
}

/// All files and datablocks transitively contained in a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub files: Vec<NodeId>,
    pub datablocks: Vec<BlockRef>,
}

impl Aggregation {
    fn of_file(node_id: NodeId, file: &FileRecord) -> Self {
        Self {
            files: vec![node_id],
            datablocks: (0..file.datablocks.len())
                .map(|index| BlockRef {
                    file: node_id,
                    index,
                })
                .collect(),
        }
    }

    fn extend(&mut self, other: &Aggregation) {
        self.files.extend_from_slice(&other.files);
        self.datablocks.extend_from_slice(&other.datablocks);
    }

    /// Resolve the file handles against `tree`.
    pub fn file_records<'t>(
        &'t self,
        tree: &'t ReportTree,
    ) -> impl Iterator<Item = &'t FileRecord> + 't {
        self.files.iter().filter_map(move |&id| tree.file(id))
    }

    /// Resolve the datablock handles against `tree`.
    pub fn datablock_records<'t>(
        &'t self,
        tree: &'t ReportTree,
    ) -> impl Iterator<Item = &'t DataBlock> + 't {
        self.datablocks
            .iter()
            .filter_map(move |block| tree.file(block.file)?.datablocks.get(block.index))
    }
}

/// Node id -> aggregation. Entries are never invalidated.
#[derive(Debug, Default)]
pub struct AggregationCache {
    entries: HashMap<NodeId, Aggregation>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute every folder's aggregation once, bottom-up.
    pub fn build(tree: &ReportTree) -> Self {
        let mut cache = Self::new();
        cache.aggregate(tree, tree.get_root());
        cache
    }

    /// Lazily compute and memoize the aggregation of `node_id`.
    ///
    /// Own files come first, followed by each subfolder's aggregation in
    /// declaration order.
    pub fn aggregate(&mut self, tree: &ReportTree, node_id: NodeId) -> &Aggregation {
        if self.entries.contains_key(&node_id) {
            return &self.entries[&node_id];
        }

        let result = match tree.node(node_id) {
            Some(ReportNode::File(file)) => Aggregation::of_file(node_id, file),
            Some(ReportNode::Folder(_)) => {
                let mut result = Aggregation::default();
                for file_id in tree.files(node_id) {
                    let sub = self.aggregate(tree, file_id);
                    result.extend(sub);
                }
                for folder_id in tree.folders(node_id) {
                    let sub = self.aggregate(tree, folder_id);
                    result.extend(sub);
                }
                result
            }
            None => Aggregation::default(),
        };

        self.entries.entry(node_id).or_insert(result)
    }

    /// Cached aggregation, if already computed.
    pub fn get(&self, node_id: NodeId) -> Option<&Aggregation> {
        self.entries.get(&node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
