use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::condition_color;
use crate::config::SourceConfig;
use crate::data::model::{Dataset, NumericColumn};
use crate::state::{AppState, PanelView};

// ---------------------------------------------------------------------------
// Left side panel – axes, legend and participant controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Panels");
    ui.separator();

    let Some(legend) = state.dataset.as_ref().map(Dataset::legend) else {
        ui.label("No dataset loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Title");
            ui.text_edit_singleline(&mut state.title);
            ui.separator();

            // ---- Axis selectors ----
            let mut x = state.x_column;
            let mut y = state.y_column;
            column_combo(ui, "x_column", "X axis", &mut x);
            column_combo(ui, "y_column", "Y axis", &mut y);
            state.set_columns(x, y);
            ui.separator();

            // ---- Legend doubles as the condition filter ----
            ui.horizontal(|ui: &mut Ui| {
                ui.strong("Conditions");
                if ui.small_button("All").clicked() {
                    state.select_all();
                }
                if ui.small_button("None").clicked() {
                    state.select_none();
                }
            });
            for entry in legend {
                let mut checked = state.filters.contains(&entry.condition);
                let text = RichText::new(entry.label).color(condition_color(entry.condition));
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_condition(entry.condition);
                }
            }
            ui.separator();

            // ---- Participant sample ----
            ui.strong("Participants");
            for (id, sample) in &state.participant_samples {
                let ids: Vec<String> = sample.iter().map(u32::to_string).collect();
                ui.label(format!("{}: {}", id.get(), ids.join(", ")));
            }
            if ui.button("Resample").clicked() {
                state.resample_participants();
            }
        });
}

fn column_combo(ui: &mut Ui, id: &str, label: &str, column: &mut NumericColumn) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(column.name())
            .show_ui(ui, |ui: &mut Ui| {
                for candidate in NumericColumn::ALL {
                    ui.selectable_value(column, candidate, candidate.name());
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open config…").clicked() {
                open_config_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.config.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        for view in PanelView::ALL {
            ui.selectable_value(&mut state.view, view, view.label());
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!("{} rows in {} experiments", ds.len(), ds.experiments().count()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open experiment data folder")
        .pick_folder();

    if let Some(root) = folder {
        // Keep the seed and delimiter of a previously opened config.
        let config = match &state.config {
            Some(previous) => SourceConfig {
                root,
                files: Default::default(),
                ..previous.clone()
            },
            None => SourceConfig::from_root(root),
        };
        state.load(config);
    }
}

pub fn open_config_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open data source config")
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match SourceConfig::from_json_file(&path) {
            Ok(config) => state.load(config),
            Err(e) => {
                log::error!("Failed to read config: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
