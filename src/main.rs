use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;

use meminsight::args::Args;
use meminsight::render::{
    self, Content, DatablockTable, FileBlock, PercentageBar, Screen, SHOW_ZERO_LABEL,
};
use meminsight::{Action, ViewerState};

const TREE_INDENT: f32 = 16.0;
const BAR_SIZE: egui::Vec2 = egui::vec2(140.0, 16.0);

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let state = args
        .load_viewer()
        .with_context(|| format!("Failed to open report {}", args.report.display()))?;

    let title = format!("MemInsight - {}", args.report.display());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        "MemInsight",
        options,
        Box::new(move |cc| {
            configure_custom_style(&cc.egui_ctx);
            Box::new(MemInsightApp::new(state))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}

fn configure_custom_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = egui::Color32::from_rgb(30, 41, 59);
    visuals.widgets.noninteractive.bg_stroke =
        egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 13));
    visuals.widgets.noninteractive.rounding = egui::Rounding::same(4.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(4.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(4.0);
    visuals.widgets.active.rounding = egui::Rounding::same(4.0);
    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(10.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);

    ctx.set_style(style);
}

struct MemInsightApp {
    state: ViewerState,
    /// Edit buffer of the search box.
    query: String,
}

impl MemInsightApp {
    fn new(state: ViewerState) -> Self {
        let query = state.query().to_string();
        Self { state, query }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui, screen: &Screen, actions: &mut Vec<Action>) {
        ui.horizontal(|ui| {
            ui.heading("MemInsight");
            ui.separator();

            ui.label("Search:");
            if ui.text_edit_singleline(&mut self.query).changed() {
                actions.push(Action::SetQuery(self.query.clone()));
            }
            ui.separator();

            for button in &screen.view_buttons {
                if ui.selectable_label(button.active, button.label).clicked() && !button.active {
                    actions.push(Action::SetViewMode(button.mode));
                }
            }
            if ui.selectable_label(screen.show_zero_size, SHOW_ZERO_LABEL).clicked() {
                actions.push(Action::ToggleZeroSize);
            }

            if let Some(created_at) = &screen.created_at {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(created_at);
                });
            }
        });

        if !screen.file_sort_buttons.is_empty() {
            ui.horizontal(|ui| {
                for button in &screen.file_sort_buttons {
                    if ui.selectable_label(button.active, button.label).clicked() {
                        actions.push(Action::SetFileSortMode(button.mode));
                    }
                }
            });
        }
    }
}

fn show_tree(ui: &mut egui::Ui, rows: &[render::TreeRow], actions: &mut Vec<Action>) {
    for row in rows {
        ui.horizontal(|ui| {
            ui.add_space(row.depth as f32 * TREE_INDENT);
            if row.is_folder {
                let toggle = if row.expanded { "[-]" } else { "[+]" };
                if ui.small_button(toggle).clicked() {
                    actions.push(Action::ToggleFolder(row.node));
                }
            }
            if ui.selectable_label(row.selected, &row.label).clicked() {
                actions.push(Action::SelectNode(row.node));
            }
        });
    }
}

fn show_content(ui: &mut egui::Ui, content: &Content, actions: &mut Vec<Action>) {
    match content {
        Content::Files { total, blocks } => {
            if let Some(total) = total {
                ui.heading(total);
            }
            for block in blocks {
                show_file_block(ui, block, actions);
                ui.separator();
            }
        }
        Content::Datablocks { header, table } => {
            ui.heading(header);
            show_table(ui, table, actions);
        }
    }
}

fn show_file_block(ui: &mut egui::Ui, block: &FileBlock, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        let toggle = if block.expanded { "[-]" } else { "[+]" };
        if ui.small_button(toggle).clicked() {
            actions.push(Action::ToggleFileBlock(block.id.clone()));
        }
        ui.strong(&block.title);
        if let Some(bar) = &block.bar {
            percentage_bar(ui, bar);
        }
    });

    if block.expanded {
        show_table(ui, &block.table, actions);
    }
}

fn show_table(ui: &mut egui::Ui, table: &DatablockTable, actions: &mut Vec<Action>) {
    egui::Grid::new(&table.key)
        .striped(true)
        .num_columns(4)
        .show(ui, |ui| {
            for header in &table.headers {
                let text = egui::RichText::new(header.label).strong();
                if ui.selectable_label(header.active, text).clicked() {
                    actions.push(Action::ToggleTableSort(table.key.clone(), header.field));
                }
            }
            ui.end_row();

            for row in &table.rows {
                ui.label(&row.kind);
                ui.label(&row.name);
                ui.label(&row.size);
                percentage_bar(ui, &row.bar);
                ui.end_row();
            }
        });
}

/// Bar filled to its percentage, red-green by share, with the value on top.
fn percentage_bar(ui: &mut egui::Ui, bar: &PercentageBar) {
    let (rect, _response) = ui.allocate_exact_size(BAR_SIZE, egui::Sense::hover());
    let painter = ui.painter();

    painter.rect_filled(rect, 3.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 20));

    let fraction = (bar.percentage / 100.0).clamp(0.0, 1.0) as f32;
    let filled =
        egui::Rect::from_min_size(rect.min, egui::vec2(rect.width() * fraction, rect.height()));
    painter.rect_filled(filled, 3.0, egui::Color32::from_rgb(bar.red, bar.green, 0));

    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        &bar.label,
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );
}

impl eframe::App for MemInsightApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let screen = render::build_screen(&self.state);
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.show_controls(ui, &screen, &mut actions);
        });

        if let Some(rows) = &screen.tree {
            egui::SidePanel::left("tree_panel")
                .resizable(true)
                .default_width(280.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        show_tree(ui, rows, &mut actions);
                    });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    show_content(ui, &screen.content, &mut actions);
                });
        });

        for action in actions {
            self.state.apply(action);
        }
    }
}
