use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::filter::ViewMode;
use crate::sort::FileSortMode;
use crate::state::{Action, ViewerState};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewArg {
    Files,
    Datablocks,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Files => ViewMode::Files,
            ViewArg::Datablocks => ViewMode::Datablocks,
        }
    }
}

/// Command-line arguments shared by the desktop and terminal viewers.
///
/// ```rust
/// use clap::Parser;
/// use meminsight::args::Args;
///
/// let args = Args::parse_from(["meminsight", "report.html", "--view", "datablocks"]);
/// assert!(args.report.ends_with("report.html"));
/// ```
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Browse memory usage reports by folder, file and datablock"
)]
pub struct Args {
    /// Report to open: a JSON report or an exported HTML page.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub report: PathBuf,

    #[arg(long, value_enum, help = "Initial view mode")]
    pub view: Option<ViewArg>,

    #[arg(
        long,
        help = "Initial file sort mode (name-desc, name-asc, size-desc, size-asc)"
    )]
    pub sort: Option<String>,

    #[arg(long, help = "Show datablocks with an estimated size of 0 B")]
    pub show_zero: bool,

    #[arg(long, help = "Initial search text")]
    pub query: Option<String>,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Config file to use instead of the default location"
    )]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Layers the command-line flags over `config`.
    ///
    /// ```rust
    /// use clap::Parser;
    /// use meminsight::args::Args;
    /// use meminsight::config::ViewerConfig;
    /// use meminsight::sort::FileSortMode;
    ///
    /// let args = Args::parse_from(["meminsight", "r.json", "--sort", "name-asc"]);
    /// let config = args.merge(ViewerConfig::default());
    /// assert_eq!(config.file_sort, FileSortMode::NameAsc);
    /// ```
    pub fn merge(&self, mut config: ViewerConfig) -> ViewerConfig {
        if let Some(view) = self.view {
            config.view = view.into();
        }
        if let Some(sort) = self.sort.as_deref() {
            config.file_sort = FileSortMode::parse_or_default(sort);
        }
        if self.show_zero {
            config.show_zero_size = true;
        }
        config
    }

    /// Resolves the configuration and opens the report.
    pub fn load_viewer(&self) -> Result<ViewerState> {
        let config = self.merge(ViewerConfig::load_or_default(self.config.as_deref()));
        let mut state = ViewerState::from_path(&self.report, config)?;
        if let Some(query) = &self.query {
            state.apply(Action::SetQuery(query.clone()));
        }
        Ok(state)
    }
}
