//! Application state shared by the GUI and the terminal front-end.
//!
//! All interaction goes through [`ViewerState::apply`]; the front-ends read
//! the state back through [`ViewerState::current_view`] or the render model.

use indextree::NodeId;
use std::collections::HashMap;
use std::path::Path;

use crate::aggregate::{Aggregation, AggregationCache};
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::expand_state::ExpansionState;
use crate::filter::{filter, FilterOptions, FilteredView, ViewMode};
use crate::report::{MemoryReport, Timestamp};
use crate::sort::{sort_datablocks, sort_files, FileSortMode, SortField, SortState, TableKey};
use crate::tree::ReportTree;

static EMPTY_AGGREGATION: Aggregation = Aggregation {
    files: Vec::new(),
    datablocks: Vec::new(),
};

/// A user interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Show the contents of a folder or a single file.
    SelectNode(NodeId),
    /// Expand or collapse a folder in the navigation tree.
    ToggleFolder(NodeId),
    SetQuery(String),
    SetViewMode(ViewMode),
    ToggleZeroSize,
    SetFileSortMode(FileSortMode),
    /// Header click on a datablock table column.
    ToggleTableSort(TableKey, SortField),
    /// Collapse or expand the datablock table of a file block.
    ToggleFileBlock(String),
}

pub struct ViewerState {
    tree: ReportTree,
    cache: AggregationCache,
    timestamp: Option<Timestamp>,
    current: NodeId,
    view: ViewMode,
    query: String,
    show_zero_size: bool,
    sort: SortState,
    folders: ExpansionState,
    /// File blocks toggled away from their default collapse state.
    file_blocks: HashMap<String, bool>,
}

impl ViewerState {
    pub fn new(report: MemoryReport, config: ViewerConfig) -> Result<Self> {
        let tree = ReportTree::build(report.memory_usage)?;
        let cache = AggregationCache::build(&tree);
        let root = tree.get_root();

        let mut folders = ExpansionState::default();
        if let Some(root_folder) = tree.folder(root) {
            folders.expand(&root_folder.id);
        }

        Ok(Self {
            tree,
            cache,
            timestamp: report.timestamp,
            current: root,
            view: config.view,
            query: String::new(),
            show_zero_size: config.show_zero_size,
            sort: SortState::new(config.file_sort, config.datablock_sort),
            folders,
            file_blocks: HashMap::new(),
        })
    }

    /// Load a report file and build the viewer state for it.
    pub fn from_path(path: &Path, config: ViewerConfig) -> Result<Self> {
        let report = MemoryReport::from_path(path)?;
        for warning in report.consistency_warnings() {
            log::warn!("{}", warning);
        }

        let state = Self::new(report, config)?;
        log::info!(
            "Loaded {} files ({}) from {}",
            state.tree.file_count(),
            crate::format::format_byte_size(state.tree.total_size()),
            path.display()
        );
        Ok(state)
    }

    pub fn tree(&self) -> &ReportTree {
        &self.tree
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    pub fn current_node(&self) -> NodeId {
        self.current
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn show_zero_size(&self) -> bool {
        self.show_zero_size
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn folders(&self) -> &ExpansionState {
        &self.folders
    }

    /// Whether the table of a file block is shown. Blocks start expanded only
    /// when a single file is listed.
    pub fn is_file_block_expanded(&self, file_id: &str, shown_files: usize) -> bool {
        self.file_blocks
            .get(file_id)
            .copied()
            .unwrap_or(shown_files == 1)
    }

    pub fn apply(&mut self, action: Action) {
        log::debug!("{:?}", action);

        match action {
            Action::SelectNode(node_id) => {
                if self.tree.node(node_id).is_some() {
                    self.current = node_id;
                    self.file_blocks.clear();
                }
            }
            Action::ToggleFolder(node_id) => {
                if let Some(folder) = self.tree.folder(node_id) {
                    self.folders.toggle(&folder.id);
                }
            }
            Action::SetQuery(query) => self.query = query,
            Action::SetViewMode(view) => {
                if view != self.view {
                    self.view = view;
                    self.file_blocks.clear();
                }
            }
            Action::ToggleZeroSize => self.show_zero_size = !self.show_zero_size,
            Action::SetFileSortMode(mode) => self.sort.files = mode,
            Action::ToggleTableSort(key, field) => {
                let mode = self.sort.toggle_table(key, field);
                log::debug!("Table sorted by {}", mode.label());
            }
            Action::ToggleFileBlock(file_id) => {
                let shown = match self.current_view() {
                    FilteredView::Files(files) => files.len(),
                    FilteredView::Datablocks(_) => 0,
                };
                let expanded = self.is_file_block_expanded(&file_id, shown);
                self.file_blocks.insert(file_id, !expanded);
            }
        }
    }

    /// Filter and sort the contents of the current node.
    pub fn current_view(&self) -> FilteredView<'_> {
        let aggregation = self.cache.get(self.current).unwrap_or(&EMPTY_AGGREGATION);
        let mut view = filter(
            &self.tree,
            aggregation,
            FilterOptions {
                query: &self.query,
                view: self.view,
                show_zero_size: self.show_zero_size,
            },
        );

        match &mut view {
            FilteredView::Files(files) => {
                sort_files(files, self.sort.files);
                for file in files.iter_mut() {
                    let key = TableKey::File(file.id().to_string());
                    sort_datablocks(&mut file.datablocks, self.sort.table_mode(&key));
                }
            }
            FilteredView::Datablocks(blocks) => {
                sort_datablocks(blocks, self.sort.table_mode(&TableKey::AllDatablocks));
            }
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DataBlock, FileRecord};
    use crate::sort::DatablockSortMode;

    fn block(name: &str, kind: &str, size: u64, factor: f64) -> DataBlock {
        DataBlock {
            name: name.to_string(),
            kind: kind.to_string(),
            size_bytes: size,
            size_factor: factor,
        }
    }

    fn sample_report() -> MemoryReport {
        MemoryReport {
            timestamp: None,
            memory_usage: vec![
                FileRecord {
                    id: "/a/x.blend".to_string(),
                    name: "x.blend".to_string(),
                    size_bytes: 100,
                    datablocks: vec![block("Mesh", "MESH", 100, 1.0)],
                },
                FileRecord {
                    id: "/a/y.blend".to_string(),
                    name: "y.blend".to_string(),
                    size_bytes: 50,
                    datablocks: vec![
                        block("Tex", "IMAGE", 50, 1.0),
                        block("Cam", "CAMERA", 0, 0.0),
                    ],
                },
            ],
        }
    }

    fn file_names(view: &FilteredView<'_>) -> Vec<String> {
        match view {
            FilteredView::Files(files) => files.iter().map(|f| f.name().to_string()).collect(),
            FilteredView::Datablocks(_) => panic!("expected files"),
        }
    }

    fn block_names(view: &FilteredView<'_>) -> Vec<String> {
        match view {
            FilteredView::Datablocks(blocks) => blocks.iter().map(|b| b.name.clone()).collect(),
            FilteredView::Files(_) => panic!("expected datablocks"),
        }
    }

    #[test]
    fn test_default_files_view_sorted_by_size() {
        let state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        assert_eq!(file_names(&state.current_view()), vec!["x.blend", "y.blend"]);
        assert!(state.folders().is_expanded("/a"));
    }

    #[test]
    fn test_search_in_datablocks_view() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        state.apply(Action::SetViewMode(ViewMode::Datablocks));
        state.apply(Action::SetQuery("tex".to_string()));
        assert_eq!(block_names(&state.current_view()), vec!["Tex"]);
    }

    #[test]
    fn test_zero_size_toggle() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        state.apply(Action::SetViewMode(ViewMode::Datablocks));
        state.apply(Action::SetQuery("cam".to_string()));
        assert!(state.current_view().is_empty());

        state.apply(Action::ToggleZeroSize);
        assert_eq!(block_names(&state.current_view()), vec!["Cam"]);
    }

    #[test]
    fn test_select_file_node() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        let y = state.tree().find_file("/a/y.blend").unwrap();
        state.apply(Action::SelectNode(y));
        assert_eq!(state.current_node(), y);
        assert_eq!(file_names(&state.current_view()), vec!["y.blend"]);
        assert!(state.is_file_block_expanded("/a/y.blend", 1));
    }

    #[test]
    fn test_table_sort_is_per_file() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        state.apply(Action::ToggleZeroSize);
        state.apply(Action::ToggleTableSort(
            TableKey::File("/a/y.blend".to_string()),
            SortField::Name,
        ));

        match state.current_view() {
            FilteredView::Files(files) => {
                let y = files.iter().find(|f| f.name() == "y.blend").unwrap();
                let names: Vec<&str> = y.datablocks.iter().map(|b| b.name.as_str()).collect();
                assert_eq!(names, vec!["Tex", "Cam"]);
            }
            FilteredView::Datablocks(_) => panic!("expected files"),
        }
        assert_eq!(
            state.sort_state().table_mode(&TableKey::File("/a/y.blend".to_string())),
            DatablockSortMode::NameDesc
        );
        assert_eq!(
            state.sort_state().table_mode(&TableKey::File("/a/x.blend".to_string())),
            DatablockSortMode::PercentageDesc
        );
    }

    #[test]
    fn test_file_block_toggle_and_reset() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        assert!(!state.is_file_block_expanded("/a/x.blend", 2));

        state.apply(Action::ToggleFileBlock("/a/x.blend".to_string()));
        assert!(state.is_file_block_expanded("/a/x.blend", 2));

        state.apply(Action::SelectNode(state.tree().get_root()));
        assert!(!state.is_file_block_expanded("/a/x.blend", 2));
    }

    #[test]
    fn test_toggle_folder() {
        let mut state = ViewerState::new(sample_report(), ViewerConfig::default()).unwrap();
        let root = state.tree().get_root();
        state.apply(Action::ToggleFolder(root));
        assert!(!state.folders().is_expanded("/a"));
    }

    #[test]
    fn test_config_applies_initial_modes() {
        let config = ViewerConfig {
            view: ViewMode::Files,
            file_sort: FileSortMode::NameAsc,
            datablock_sort: DatablockSortMode::NameAsc,
            show_zero_size: true,
        };
        let state = ViewerState::new(sample_report(), config).unwrap();
        assert_eq!(file_names(&state.current_view()), vec!["x.blend", "y.blend"]);
        assert_eq!(
            state.sort_state().table_mode(&TableKey::AllDatablocks),
            DatablockSortMode::NameAsc
        );
    }

    #[test]
    fn test_empty_report() {
        let state = ViewerState::new(
            MemoryReport {
                timestamp: None,
                memory_usage: Vec::new(),
            },
            ViewerConfig::default(),
        )
        .unwrap();
        assert!(state.current_view().is_empty());
    }
}
