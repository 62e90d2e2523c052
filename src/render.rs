//! Presentation model shared by the GUI and the terminal front-end.
//!
//! [`build_screen`] turns the filtered and sorted view of a [`ViewerState`]
//! into plain rows, buttons and tables. The front-ends only draw it and
//! translate clicks back into [`crate::state::Action`]s.

use indextree::NodeId;
use std::io::{self, Write};

use crate::filter::{FileView, FilteredView, ViewMode};
use crate::format::{format_byte_size, format_percentage, format_timestamp, percentage_color};
use crate::report::DataBlock;
use crate::sort::{DatablockSortMode, FileSortMode, SortField, TableKey};
use crate::state::ViewerState;
use crate::tree::ReportTree;

pub const SHOW_ZERO_LABEL: &str = "Show 0B";

/// One visible line of the navigation tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub node: NodeId,
    pub label: String,
    pub depth: usize,
    pub is_folder: bool,
    pub expanded: bool,
    pub selected: bool,
}

/// A toggle button of a mode group.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeButton<M> {
    pub mode: M,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PercentageBar {
    /// Width of the bar, 0 to 100.
    pub percentage: f64,
    pub label: String,
    pub red: u8,
    pub green: u8,
}

impl PercentageBar {
    pub fn new(percentage: f64) -> Self {
        let percentage = if percentage.is_finite() { percentage } else { 0.0 };
        let (red, green) = percentage_color(percentage);
        Self {
            percentage,
            label: format_percentage(percentage / 100.0),
            red,
            green,
        }
    }
}

/// Clickable column header. `label` names the active mode when the table is
/// sorted by this column.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderCell {
    pub field: SortField,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatablockRow {
    pub kind: String,
    pub name: String,
    pub size: String,
    pub bar: PercentageBar,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatablockTable {
    pub key: TableKey,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<DatablockRow>,
}

/// A file of the FILES view with its collapsible datablock table.
#[derive(Clone, Debug, PartialEq)]
pub struct FileBlock {
    pub id: String,
    pub title: String,
    /// Share of the listed total; only shown when several files are listed.
    pub bar: Option<PercentageBar>,
    pub expanded: bool,
    pub table: DatablockTable,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Files {
        total: Option<String>,
        blocks: Vec<FileBlock>,
    },
    Datablocks {
        header: String,
        table: DatablockTable,
    },
}

/// Everything a front-end needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    /// `None` when the report holds fewer than two files.
    pub tree: Option<Vec<TreeRow>>,
    pub query: String,
    pub view_buttons: Vec<ModeButton<ViewMode>>,
    pub show_zero_size: bool,
    /// Empty outside the FILES view.
    pub file_sort_buttons: Vec<ModeButton<FileSortMode>>,
    pub created_at: Option<String>,
    pub content: Content,
}

pub fn build_screen(state: &ViewerState) -> Screen {
    let view = state.view_mode();

    let view_buttons = ViewMode::ALL
        .iter()
        .map(|&mode| ModeButton {
            mode,
            label: mode.label(),
            active: mode == view,
        })
        .collect();

    let file_sort_buttons = if view == ViewMode::Files {
        FileSortMode::ALL
            .iter()
            .map(|&mode| ModeButton {
                mode,
                label: mode.label(),
                active: mode == state.sort_state().files,
            })
            .collect()
    } else {
        Vec::new()
    };

    Screen {
        tree: tree_rows(state),
        query: state.query().to_string(),
        view_buttons,
        show_zero_size: state.show_zero_size(),
        file_sort_buttons,
        created_at: state
            .timestamp()
            .map(|ts| format!("Created at: {}", format_timestamp(ts))),
        content: build_content(state),
    }
}

/// Visible rows of the navigation tree, depth first. Subfolders are listed
/// before the files of a folder.
pub fn tree_rows(state: &ViewerState) -> Option<Vec<TreeRow>> {
    let tree = state.tree();
    if tree.file_count() < 2 {
        return None;
    }

    let mut rows = Vec::new();
    push_folder_rows(state, tree, tree.get_root(), 0, &mut rows);
    Some(rows)
}

fn push_folder_rows(
    state: &ViewerState,
    tree: &ReportTree,
    node_id: NodeId,
    depth: usize,
    rows: &mut Vec<TreeRow>,
) {
    let Some(folder) = tree.folder(node_id) else {
        return;
    };
    let expanded = state.folders().is_expanded(&folder.id);

    rows.push(TreeRow {
        node: node_id,
        label: folder.name.clone(),
        depth,
        is_folder: true,
        expanded,
        selected: state.current_node() == node_id,
    });

    if !expanded {
        return;
    }

    for child in tree.folders(node_id) {
        push_folder_rows(state, tree, child, depth + 1, rows);
    }
    for child in tree.files(node_id) {
        if let Some(file) = tree.file(child) {
            rows.push(TreeRow {
                node: child,
                label: file.name.clone(),
                depth: depth + 1,
                is_folder: false,
                expanded: false,
                selected: state.current_node() == child,
            });
        }
    }
}

fn build_content(state: &ViewerState) -> Content {
    match state.current_view() {
        FilteredView::Files(files) => {
            let total_size: u64 = files.iter().map(FileView::size_bytes).sum();
            let several = files.len() > 1;
            let total = several
                .then(|| format!("Total Estimated Size: {}", format_byte_size(total_size)));

            let blocks = files
                .iter()
                .map(|file| {
                    let key = TableKey::File(file.id().to_string());
                    let bar = several.then(|| {
                        let share = if total_size > 0 {
                            file.size_bytes() as f64 / total_size as f64 * 100.0
                        } else {
                            0.0
                        };
                        PercentageBar::new(share)
                    });

                    FileBlock {
                        id: file.id().to_string(),
                        title: format!("{} ({})", file.name(), format_byte_size(file.size_bytes())),
                        bar,
                        expanded: state.is_file_block_expanded(file.id(), files.len()),
                        table: build_table(
                            key.clone(),
                            state.sort_state().table_mode(&key),
                            &file.datablocks,
                        ),
                    }
                })
                .collect();

            Content::Files { total, blocks }
        }
        FilteredView::Datablocks(blocks) => {
            let key = TableKey::AllDatablocks;
            let mode = state.sort_state().table_mode(&key);
            Content::Datablocks {
                header: format!("All Datablocks: {}", blocks.len()),
                table: build_table(key, mode, &blocks),
            }
        }
    }
}

fn build_table(key: TableKey, mode: DatablockSortMode, blocks: &[&DataBlock]) -> DatablockTable {
    let headers = SortField::COLUMNS
        .iter()
        .map(|&field| {
            let active = mode.field() == field;
            HeaderCell {
                field,
                label: if active { mode.label() } else { field.label() },
                active,
            }
        })
        .collect();

    let rows = blocks
        .iter()
        .map(|block| DatablockRow {
            kind: block.kind.clone(),
            name: block.name.clone(),
            size: format_byte_size(block.size_bytes),
            bar: PercentageBar::new(block.size_factor * 100.0),
        })
        .collect();

    DatablockTable { key, headers, rows }
}

/// Plain text rendition of a screen.
pub fn print_screen(screen: &Screen, out: &mut impl Write) -> io::Result<()> {
    let buttons: Vec<String> = screen.view_buttons.iter().map(button_text).collect();
    let zero = if screen.show_zero_size { "[x]" } else { "[ ]" };
    writeln!(out, "{}  {} {}", buttons.join(" "), zero, SHOW_ZERO_LABEL)?;

    if !screen.file_sort_buttons.is_empty() {
        let buttons: Vec<String> = screen.file_sort_buttons.iter().map(button_text).collect();
        writeln!(out, "Sort: {}", buttons.join(" "))?;
    }
    if !screen.query.is_empty() {
        writeln!(out, "Search: {}", screen.query)?;
    }
    if let Some(created_at) = &screen.created_at {
        writeln!(out, "{}", created_at)?;
    }

    if let Some(rows) = &screen.tree {
        writeln!(out)?;
        for row in rows {
            let marker = match (row.is_folder, row.expanded) {
                (true, true) => "[-] ",
                (true, false) => "[+] ",
                (false, _) => "    ",
            };
            let selected = if row.selected { " *" } else { "" };
            writeln!(out, "{}{}{}{}", "  ".repeat(row.depth), marker, row.label, selected)?;
        }
    }

    writeln!(out)?;
    match &screen.content {
        Content::Files { total, blocks } => {
            if let Some(total) = total {
                writeln!(out, "{}", total)?;
            }
            for block in blocks {
                let toggle = if block.expanded { "[-]" } else { "[+]" };
                match &block.bar {
                    Some(bar) => writeln!(out, "{} {}  {}", toggle, block.title, bar.label)?,
                    None => writeln!(out, "{} {}", toggle, block.title)?,
                }
                if block.expanded {
                    print_table(&block.table, out)?;
                }
            }
        }
        Content::Datablocks { header, table } => {
            writeln!(out, "{}", header)?;
            print_table(table, out)?;
        }
    }
    Ok(())
}

fn button_text<M>(button: &ModeButton<M>) -> String {
    if button.active {
        format!("[{}]", button.label)
    } else {
        button.label.to_string()
    }
}

fn print_table(table: &DatablockTable, out: &mut impl Write) -> io::Result<()> {
    let cells: Vec<[&str; 4]> = table
        .rows
        .iter()
        .map(|row| {
            [
                row.kind.as_str(),
                row.name.as_str(),
                row.size.as_str(),
                row.bar.label.as_str(),
            ]
        })
        .collect();

    let mut widths = [0usize; 4];
    for (i, header) in table.headers.iter().enumerate().take(4) {
        widths[i] = header.label.chars().count();
    }
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let header: Vec<String> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<w$}", h.label, w = widths[i]))
        .collect();
    writeln!(out, "    {}", header.join("  ").trim_end())?;

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<w$}", cell, w = widths[i]))
            .collect();
        writeln!(out, "    {}", line.join("  ").trim_end())?;
    }
    Ok(())
}
