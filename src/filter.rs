use crate::aggregate::Aggregation;
use crate::report::{DataBlock, FileRecord};
use crate::tree::ReportTree;

/// What the content area lists.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ViewMode {
    #[default]
    Files,
    Datablocks,
}

impl ViewMode {
    pub const ALL: [ViewMode; 2] = [ViewMode::Files, ViewMode::Datablocks];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Files => "Files",
            ViewMode::Datablocks => "Datablocks",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Files => "files",
            ViewMode::Datablocks => "datablocks",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn next(self) -> Self {
        match self {
            ViewMode::Files => ViewMode::Datablocks,
            ViewMode::Datablocks => ViewMode::Files,
        }
    }
}

/// A file as shown in the FILES view: the canonical record plus the subset
/// of its datablocks that survived filtering, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileView<'t> {
    pub record: &'t FileRecord,
    pub datablocks: Vec<&'t DataBlock>,
}

impl<'t> FileView<'t> {
    pub fn id(&self) -> &'t str {
        &self.record.id
    }

    pub fn name(&self) -> &'t str {
        &self.record.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.record.size_bytes
    }
}

/// Filtered subset of a node, shaped by the view mode.
#[derive(Debug, Clone, PartialEq)]
pub enum FilteredView<'t> {
    Files(Vec<FileView<'t>>),
    Datablocks(Vec<&'t DataBlock>),
}

impl FilteredView<'_> {
    pub fn len(&self) -> usize {
        match self {
            FilteredView::Files(files) => files.len(),
            FilteredView::Datablocks(blocks) => blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FilterOptions<'q> {
    pub query: &'q str,
    pub view: ViewMode,
    pub show_zero_size: bool,
}

/// Produce the visible subset of the files or datablocks of an aggregation.
pub fn filter<'t>(
    tree: &'t ReportTree,
    aggregation: &'t Aggregation,
    options: FilterOptions<'_>,
) -> FilteredView<'t> {
    match options.view {
        ViewMode::Files => FilteredView::Files(filter_files(
            aggregation.file_records(tree),
            options.query,
            options.show_zero_size,
        )),
        ViewMode::Datablocks => FilteredView::Datablocks(filter_datablocks(
            aggregation.datablock_records(tree),
            options.query,
            options.show_zero_size,
        )),
    }
}

/// A file is kept when its name or any of its datablocks matches. A name
/// match with no matching blocks keeps every block. Zero sized blocks are
/// dropped unless `show_zero_size`, and files left without blocks are dropped.
pub fn filter_files<'t>(
    files: impl Iterator<Item = &'t FileRecord>,
    query: &str,
    show_zero_size: bool,
) -> Vec<FileView<'t>> {
    let query = query.to_lowercase();

    files
        .filter_map(|file| {
            let name_match = file.name.to_lowercase().contains(&query);
            let matching: Vec<&DataBlock> = file
                .datablocks
                .iter()
                .filter(|block| block_matches(block, &query))
                .collect();

            if !name_match && matching.is_empty() {
                return None;
            }

            let mut datablocks = if matching.is_empty() {
                file.datablocks.iter().collect()
            } else {
                matching
            };

            if !show_zero_size {
                datablocks.retain(|block| block.size_bytes != 0);
                if datablocks.is_empty() {
                    return None;
                }
            }

            Some(FileView {
                record: file,
                datablocks,
            })
        })
        .collect()
}

/// Datablocks matching `query` by name or type, optionally without zero sized ones.
pub fn filter_datablocks<'t>(
    blocks: impl Iterator<Item = &'t DataBlock>,
    query: &str,
    show_zero_size: bool,
) -> Vec<&'t DataBlock> {
    let query = query.to_lowercase();

    blocks
        .filter(|block| show_zero_size || block.size_bytes != 0)
        .filter(|block| block_matches(block, &query))
        .collect()
}

/// Case-insensitive substring match on name or type. `query` must be lowercase.
fn block_matches(block: &DataBlock, query: &str) -> bool {
    block.name.to_lowercase().contains(query) || block.kind.to_lowercase().contains(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregationCache;

    fn block(name: &str, kind: &str, size: u64) -> DataBlock {
        DataBlock {
            name: name.to_string(),
            kind: kind.to_string(),
            size_bytes: size,
            size_factor: 0.0,
        }
    }

    fn record(id: &str, blocks: Vec<DataBlock>) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: id.rsplit('/').next().unwrap_or(id).to_string(),
            size_bytes: blocks.iter().map(|b| b.size_bytes).sum(),
            datablocks: blocks,
        }
    }

    fn sample_records() -> Vec<FileRecord> {
        vec![
            record(
                "/a/house.blend",
                vec![
                    block("Wall", "MESH", 10),
                    block("Brick", "IMAGE", 20),
                    block("Empty", "OBJECT", 0),
                ],
            ),
            record("/a/tree.blend", vec![block("Bark", "IMAGE", 5)]),
            record("/a/void.blend", vec![block("Nothing", "OBJECT", 0)]),
        ]
    }

    fn names<'a>(files: &[FileView<'a>]) -> Vec<&'a str> {
        files.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_empty_query_keeps_nonzero_files() {
        let records = sample_records();
        let files = filter_files(records.iter(), "", false);
        assert_eq!(names(&files), vec!["house.blend", "tree.blend"]);
        assert_eq!(files[0].datablocks.len(), 2);
    }

    #[test]
    fn test_show_zero_size_keeps_everything() {
        let records = sample_records();
        let files = filter_files(records.iter(), "", true);
        assert_eq!(names(&files), vec!["house.blend", "tree.blend", "void.blend"]);
        assert_eq!(files[0].datablocks.len(), 3);
    }

    #[test]
    fn test_block_match_narrows_blocks() {
        let records = sample_records();
        let files = filter_files(records.iter(), "image", false);
        assert_eq!(names(&files), vec!["house.blend", "tree.blend"]);
        assert_eq!(files[0].datablocks, vec![&records[0].datablocks[1]]);
    }

    #[test]
    fn test_name_match_keeps_all_blocks() {
        let records = sample_records();
        let files = filter_files(records.iter(), "HOUSE", false);
        assert_eq!(names(&files), vec!["house.blend"]);
        assert_eq!(files[0].datablocks.len(), 2);
        // The canonical record is untouched.
        assert_eq!(records[0].datablocks.len(), 3);
    }

    #[test]
    fn test_name_and_block_match_keeps_matching_blocks_only() {
        let records = vec![record(
            "/a/wall.blend",
            vec![block("Wall", "MESH", 1), block("Roof", "MESH", 2)],
        )];
        let files = filter_files(records.iter(), "wall", false);
        assert_eq!(files[0].datablocks.len(), 1);
        assert_eq!(files[0].datablocks[0].name, "Wall");
    }

    #[test]
    fn test_only_zero_blocks_match_drops_file() {
        let records = sample_records();
        let files = filter_files(records.iter(), "empty", false);
        assert!(files.is_empty());
        let files = filter_files(records.iter(), "empty", true);
        assert_eq!(names(&files), vec!["house.blend"]);
    }

    #[test]
    fn test_datablocks_view() {
        let records = sample_records();
        let all = || records.iter().flat_map(|r| r.datablocks.iter());
        let blocks = filter_datablocks(all(), "b", false);
        let found: Vec<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(found, vec!["Brick", "Bark"]);

        let blocks = filter_datablocks(all(), "object", true);
        assert_eq!(blocks.len(), 2);
        let blocks = filter_datablocks(all(), "object", false);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_filter_over_tree_node() {
        let tree = ReportTree::build(vec![
            record("/a/x.blend", vec![block("Mesh", "MESH", 100)]),
            record("/a/y.blend", vec![block("Tex", "IMAGE", 50)]),
        ])
        .unwrap();
        let mut cache = AggregationCache::new();
        let aggregation = cache.aggregate(&tree, tree.get_root()).clone();

        let view = filter(
            &tree,
            &aggregation,
            FilterOptions {
                query: "tex",
                view: ViewMode::Datablocks,
                show_zero_size: false,
            },
        );
        match view {
            FilteredView::Datablocks(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert_eq!(blocks[0].name, "Tex");
            }
            FilteredView::Files(_) => panic!("expected datablocks"),
        }
    }

    #[test]
    fn test_view_mode_parsing() {
        assert_eq!(ViewMode::from_str("Datablocks"), Some(ViewMode::Datablocks));
        assert_eq!(ViewMode::from_str("files"), Some(ViewMode::Files));
        assert_eq!(ViewMode::from_str("tree"), None);
        assert_eq!(ViewMode::Files.next(), ViewMode::Datablocks);
    }
}
