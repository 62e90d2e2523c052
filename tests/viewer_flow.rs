use std::fs;

use anyhow::Result;
use meminsight::config::ViewerConfig;
use meminsight::filter::{FilteredView, ViewMode};
use meminsight::render::{build_screen, print_screen, Content};
use meminsight::sort::{FileSortMode, SortField, TableKey};
use meminsight::{Action, ReportError, ViewerState};
use tempfile::TempDir;

const REPORT_JSON: &str = r#"{
  "timestamp": 1700000000000,
  "memory_usage": [
    {"id": "/a/x.blend", "name": "x.blend", "size_bytes": 100,
     "datablocks": [{"name": "Mesh", "type": "MESH", "size_bytes": 100, "size_factor": 1.0}]},
    {"id": "/a/y.blend", "name": "y.blend", "size_bytes": 50,
     "datablocks": [{"name": "Tex", "type": "IMAGE", "size_bytes": 50, "size_factor": 1.0},
                    {"name": "Camera", "type": "CAMERA", "size_bytes": 0, "size_factor": 0.0}]}
  ]
}"#;

fn write_report(dir: &TempDir, name: &str, content: &str) -> Result<std::path::PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, content)?;
    Ok(path)
}

fn file_names(state: &ViewerState) -> Vec<String> {
    match state.current_view() {
        FilteredView::Files(files) => files.iter().map(|f| f.name().to_string()).collect(),
        FilteredView::Datablocks(_) => Vec::new(),
    }
}

fn block_names(state: &ViewerState) -> Vec<String> {
    match state.current_view() {
        FilteredView::Datablocks(blocks) => blocks.iter().map(|b| b.name.clone()).collect(),
        FilteredView::Files(_) => Vec::new(),
    }
}

#[test]
fn json_report_files_view_sorted_by_size() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "report.json", REPORT_JSON)?;

    let mut state = ViewerState::from_path(&path, ViewerConfig::default())?;
    assert_eq!(file_names(&state), vec!["x.blend", "y.blend"]);

    state.apply(Action::SetFileSortMode(FileSortMode::SizeAsc));
    assert_eq!(file_names(&state), vec!["y.blend", "x.blend"]);

    state.apply(Action::SetFileSortMode(FileSortMode::NameDesc));
    assert_eq!(file_names(&state), vec!["y.blend", "x.blend"]);
    Ok(())
}

#[test]
fn html_export_search_and_zero_size_toggle() -> Result<()> {
    let dir = TempDir::new()?;
    let escaped = REPORT_JSON.replace('"', "&quot;");
    let html = format!(
        "<!DOCTYPE html><html><head><title>Memory</title></head><body>\
         <div id=\"jsonData\" style=\"display: none\">{}</div>\
         <div id=\"content\"></div></body></html>",
        escaped
    );
    let path = write_report(&dir, "report.html", &html)?;

    let mut state = ViewerState::from_path(&path, ViewerConfig::default())?;
    state.apply(Action::SetViewMode(ViewMode::Datablocks));
    state.apply(Action::SetQuery("tex".to_string()));
    assert_eq!(block_names(&state), vec!["Tex"]);

    // Zero sized blocks stay hidden even when they match.
    state.apply(Action::SetQuery("CAM".to_string()));
    assert!(block_names(&state).is_empty());
    state.apply(Action::ToggleZeroSize);
    assert_eq!(block_names(&state), vec!["Camera"]);
    Ok(())
}

#[test]
fn file_match_keeps_all_nonzero_blocks() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "report.json", REPORT_JSON)?;

    let mut state = ViewerState::from_path(&path, ViewerConfig::default())?;
    state.apply(Action::SetQuery("y.bl".to_string()));
    match state.current_view() {
        FilteredView::Files(files) => {
            assert_eq!(files.len(), 1);
            let names: Vec<&str> = files[0].datablocks.iter().map(|b| b.name.as_str()).collect();
            assert_eq!(names, vec!["Tex"]);
        }
        FilteredView::Datablocks(_) => panic!("expected files"),
    }
    Ok(())
}

#[test]
fn header_clicks_cycle_table_sort() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "report.json", REPORT_JSON)?;

    let mut state = ViewerState::from_path(&path, ViewerConfig::default())?;
    state.apply(Action::SetViewMode(ViewMode::Datablocks));

    state.apply(Action::ToggleTableSort(TableKey::AllDatablocks, SortField::Size));
    assert_eq!(block_names(&state), vec!["Mesh", "Tex"]);
    state.apply(Action::ToggleTableSort(TableKey::AllDatablocks, SortField::Size));
    assert_eq!(block_names(&state), vec!["Tex", "Mesh"]);

    match build_screen(&state).content {
        Content::Datablocks { header, table } => {
            assert_eq!(header, "All Datablocks: 2");
            assert_eq!(table.headers[2].label, "Estimated Size↑");
        }
        Content::Files { .. } => panic!("expected datablocks"),
    }
    Ok(())
}

#[test]
fn config_file_sets_initial_view() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "report.json", REPORT_JSON)?;
    let config_path = write_report(
        &dir,
        "config.yaml",
        "view: datablocks\ndatablock_sort: name-asc\nshow_zero_size: true\n",
    )?;

    let config = ViewerConfig::load_or_default(Some(&config_path));
    let state = ViewerState::from_path(&path, config)?;
    assert_eq!(state.view_mode(), ViewMode::Datablocks);
    assert_eq!(block_names(&state), vec!["Camera", "Mesh", "Tex"]);
    Ok(())
}

#[test]
fn printed_screen_lists_files() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "report.json", REPORT_JSON)?;
    let state = ViewerState::from_path(&path, ViewerConfig::default())?;

    let mut out = Vec::new();
    print_screen(&build_screen(&state), &mut out)?;
    let text = String::from_utf8(out)?;

    assert!(text.contains("Created at: 2023-11-1"));
    assert!(text.contains("Total Estimated Size: 150.00 B"));
    assert!(text.contains("[+] x.blend (100.00 B)  66.67%"));
    assert!(text.contains("[+] y.blend (50.00 B)  33.33%"));
    Ok(())
}

#[test]
fn html_without_embedded_data_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "empty.html", "<html><body>nothing here</body></html>")?;

    let err = ViewerState::from_path(&path, ViewerConfig::default())
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
    assert!(matches!(err, ReportError::MissingEmbeddedData { .. }));
    Ok(())
}

#[test]
fn malformed_json_and_missing_file_are_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "broken.json", "{\"memory_usage\": [")?;

    assert!(matches!(
        ViewerState::from_path(&path, ViewerConfig::default()),
        Err(ReportError::Json(_))
    ));
    assert!(matches!(
        ViewerState::from_path(&dir.path().join("absent.json"), ViewerConfig::default()),
        Err(ReportError::Io(_))
    ));
    Ok(())
}

#[test]
fn empty_report_shows_empty_views() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_report(&dir, "empty.json", r#"{"memory_usage": []}"#)?;

    let mut state = ViewerState::from_path(&path, ViewerConfig::default())?;
    assert!(state.current_view().is_empty());
    state.apply(Action::SetViewMode(ViewMode::Datablocks));
    assert!(state.current_view().is_empty());

    let screen = build_screen(&state);
    assert!(screen.tree.is_none());
    assert!(screen.created_at.is_none());
    Ok(())
}
