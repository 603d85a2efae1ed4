use std::collections::BTreeSet;

use eframe::egui::{self, CollapsingHeader, Color32, ComboBox, RichText, ScrollArea, Ui};

use crate::data::model::{CellValue, column_label};
use crate::state::{AppState, Section};

// ---------------------------------------------------------------------------
// Side panel
// ---------------------------------------------------------------------------

/// Section switcher, colour grouping and categorical filters.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Sections");
    ui.separator();
    for section in Section::ALL {
        ui.radio_value(&mut state.section, section, section.label());
    }
    ui.add_space(8.0);

    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No fan table loaded.");
        return;
    };
    // owned copies, the widgets below mutate state
    let columns = dataset.column_names.clone();
    let unique = dataset.unique_values.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            color_by_selector(ui, state, &columns);
            ui.separator();
            for col in &columns {
                if let Some(values) = unique.get(col) {
                    column_filter(ui, state, col, values);
                }
            }
        });
}

fn color_by_selector(ui: &mut Ui, state: &mut AppState, columns: &[String]) {
    ui.strong("Color by");
    let current = state.color_column.clone().unwrap_or_default();
    ComboBox::from_id_salt("color_by")
        .selected_text(column_label(&current))
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                let picked = ui.selectable_label(current == *col, column_label(col));
                if picked.clicked() {
                    state.set_color_column(col.clone());
                }
            }
        });

    let Some(cm) = &state.color_map else {
        return;
    };
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (label, color) in cm.legend_entries() {
            ui.label(RichText::new(format!("● {label}")).color(color));
        }
    });
}

/// Checkbox list for one categorical column, tinted when it drives colour.
fn column_filter(ui: &mut Ui, state: &mut AppState, col: &str, values: &BTreeSet<CellValue>) {
    let kept = state.filters.get(col).map_or(0, |s| s.len());
    let title = format!("{}  ({kept}/{})", column_label(col), values.len());
    let tint = state.color_column.as_deref() == Some(col);

    CollapsingHeader::new(RichText::new(title).strong())
        .id_salt(col)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(col);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(col);
                }
            });

            for val in values {
                let text = match (&state.color_map, tint) {
                    (Some(cm), true) => RichText::new(val.to_string()).color(cm.color_for(val)),
                    _ => RichText::new(val.to_string()),
                };
                let mut on = state.filters.get(col).is_some_and(|s| s.contains(val));
                if ui.checkbox(&mut on, text).changed() {
                    state.toggle_filter_value(col, val);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// File menu, row counts and the last load error.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open fans…").clicked() {
                pick_fans_file(state);
                ui.close_menu();
            }
            if ui.button("Open cluster summary…").clicked() {
                pick_summary_file(state);
                ui.close_menu();
            }
        });
        ui.separator();

        match &state.dataset {
            Some(ds) => {
                ui.label(format!("{} of {} fans shown", state.visible_indices.len(), ds.len()));
                if state.summary.is_none() {
                    ui.separator();
                    ui.label(RichText::new("cluster summary derived from fans").weak());
                }
            }
            None => {
                ui.label(RichText::new("no fan table").weak());
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

fn pick_fans_file(state: &mut AppState) {
    let picked = rfd::FileDialog::new()
        .set_title("Open fan table")
        .add_filter("Fan tables", &["csv", "json", "parquet", "pq"])
        .pick_file();
    if let Some(path) = picked {
        state.load_fans_from(&path);
    }
}

fn pick_summary_file(state: &mut AppState) {
    let picked = rfd::FileDialog::new()
        .set_title("Open cluster summary")
        .add_filter("CSV", &["csv"])
        .pick_file();
    if let Some(path) = picked {
        state.load_summary_from(&path);
    }
}
