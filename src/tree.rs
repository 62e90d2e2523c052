use indextree::{Arena, NodeId};
use std::collections::HashMap;

use crate::error::{ReportError, Result};
use crate::report::FileRecord;

/// A folder in the report hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNode {
    /// Concatenation of ancestor path segments.
    pub id: String,
    pub name: String,
}

/// Represents a node in the report tree
#[derive(Debug, Clone, PartialEq)]
pub enum ReportNode {
    Folder(FolderNode),
    File(FileRecord),
}

impl ReportNode {
    pub fn id(&self) -> &str {
        match self {
            ReportNode::Folder(folder) => &folder.id,
            ReportNode::File(file) => &file.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ReportNode::Folder(folder) => &folder.name,
            ReportNode::File(file) => &file.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ReportNode::Folder(_))
    }
}

/// Immutable folder/file hierarchy built from the flat report list, stored in
/// an arena allocator.
pub struct ReportTree {
    arena: Arena<ReportNode>,
    root: NodeId,
    folder_index: HashMap<String, NodeId>,
    file_index: HashMap<String, NodeId>,
}

impl ReportTree {
    /// Build the hierarchy keyed by the longest common path prefix of all
    /// record ids. Folder and file order follows input order.
    pub fn build(records: Vec<FileRecord>) -> Result<Self> {
        let split: Vec<Vec<Segment>> = records.iter().map(|r| split_path(&r.id)).collect();
        let (common_len, prefix) = literal_prefix(&records, &split);

        let mut arena = Arena::new();
        let root = arena.new_node(ReportNode::Folder(FolderNode {
            id: prefix.clone(),
            name: prefix.clone(),
        }));
        let mut folder_index = HashMap::new();
        folder_index.insert(prefix.clone(), root);

        let mut tree = Self {
            arena,
            root,
            folder_index,
            file_index: HashMap::new(),
        };

        for (record, segments) in records.into_iter().zip(split) {
            if segments.is_empty()
                || segments.len() < common_len
                || !record.id.starts_with(&prefix)
            {
                return Err(ReportError::MalformedPath {
                    id: record.id,
                    prefix,
                });
            }

            // Strip the common prefix, keep the folder segments, drop the file name.
            let relative = &segments[common_len..];
            let folder_segments = &relative[..relative.len().saturating_sub(1)];

            let mut parent = tree.root;
            for segment in folder_segments {
                let name = segment.text(&record.id);
                if name.is_empty() {
                    continue;
                }
                parent = tree.child_folder(parent, name);
            }

            let file_id = record.id.clone();
            let node_id = tree.arena.new_node(ReportNode::File(record));
            parent.append(node_id, &mut tree.arena);
            tree.file_index.insert(file_id, node_id);
        }

        Ok(tree)
    }

    /// Find the child folder named `name`, creating it when absent.
    fn child_folder(&mut self, parent: NodeId, name: &str) -> NodeId {
        let parent_id = self.arena[parent].get().id().to_string();
        let folder_id = format!("{}/{}", parent_id, name);

        if let Some(&existing) = self.folder_index.get(&folder_id) {
            return existing;
        }

        let node_id = self.arena.new_node(ReportNode::Folder(FolderNode {
            id: folder_id.clone(),
            name: name.to_string(),
        }));
        parent.append(node_id, &mut self.arena);
        self.folder_index.insert(folder_id, node_id);
        node_id
    }

    pub fn get_root(&self) -> NodeId {
        self.root
    }

    pub fn get_arena(&self) -> &Arena<ReportNode> {
        &self.arena
    }

    pub fn node(&self, node_id: NodeId) -> Option<&ReportNode> {
        self.arena.get(node_id).map(|n| n.get())
    }

    pub fn file(&self, node_id: NodeId) -> Option<&FileRecord> {
        match self.node(node_id)? {
            ReportNode::File(file) => Some(file),
            ReportNode::Folder(_) => None,
        }
    }

    pub fn folder(&self, node_id: NodeId) -> Option<&FolderNode> {
        match self.node(node_id)? {
            ReportNode::Folder(folder) => Some(folder),
            ReportNode::File(_) => None,
        }
    }

    /// Child folders of `node_id`, in creation order.
    pub fn folders(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node_id
            .children(&self.arena)
            .filter(|&child| self.arena[child].get().is_folder())
    }

    /// Files directly inside `node_id`, in input order.
    pub fn files(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node_id
            .children(&self.arena)
            .filter(|&child| !self.arena[child].get().is_folder())
    }

    pub fn find_folder(&self, id: &str) -> Option<NodeId> {
        self.folder_index.get(id).copied()
    }

    pub fn find_file(&self, id: &str) -> Option<NodeId> {
        self.file_index.get(id).copied()
    }

    /// Number of file records in the whole tree.
    pub fn file_count(&self) -> usize {
        self.root
            .descendants(&self.arena)
            .filter(|&id| !self.arena[id].get().is_folder())
            .count()
    }

    /// Get total size of the tree
    pub fn total_size(&self) -> u64 {
        self.root
            .descendants(&self.arena)
            .filter_map(|id| self.file(id))
            .map(|file| file.size_bytes)
            .sum()
    }
}

/// A path segment as a byte range into the record id.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
}

impl Segment {
    fn text<'a>(&self, path: &'a str) -> &'a str {
        &path[self.start..self.end]
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Split on runs of `/` or `\`. A leading empty segment marks an absolute path.
fn split_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = 0;

    for (pos, c) in path.char_indices() {
        if is_separator(c) {
            if pos > start || (segments.is_empty() && pos == 0) {
                segments.push(Segment { start, end: pos });
            }
            start = pos + c.len_utf8();
        }
    }
    if start < path.len() {
        segments.push(Segment {
            start,
            end: path.len(),
        });
    }

    segments
}

/// Number of leading segments shared by every path.
fn common_prefix_len(records: &[FileRecord], paths: &[Vec<Segment>]) -> usize {
    let (Some(first_record), Some(first)) = (records.first(), paths.first()) else {
        return 0;
    };

    let mut len = first.len();
    for (record, segments) in records.iter().zip(paths).skip(1) {
        len = first[..len]
            .iter()
            .zip(segments)
            .take_while(|(a, b)| a.text(&first_record.id) == b.text(&record.id))
            .count();
        if len == 0 {
            break;
        }
    }
    len
}

/// Common segment count and root id. Segments are compared by text, so the
/// separators between them can differ; drop trailing segments until the
/// first id's text up to them is a literal prefix of every id.
fn literal_prefix(records: &[FileRecord], paths: &[Vec<Segment>]) -> (usize, String) {
    let (Some(first_record), Some(first)) = (records.first(), paths.first()) else {
        return (0, String::new());
    };

    let mut len = common_prefix_len(records, paths);
    while len > 0 {
        let prefix = &first_record.id[..first[len - 1].end];
        if records.iter().all(|r| r.id.starts_with(prefix)) {
            return (len, prefix.to_string());
        }
        len -= 1;
    }
    (0, String::new())
}
