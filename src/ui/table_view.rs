use crate::database::Table;
use eframe::egui;
use egui_extras::{Column, TableBuilder};

const ROW_HEIGHT: f32 = 18.0;

/// Shows a query result as a striped, scrollable table. `id` has to be unique among the tables on
/// screen at once.
pub fn show(ui: &mut egui::Ui, id: impl std::hash::Hash, table: &Table, max_height: f32) {
    if table.is_empty() {
        ui.label("No rows.");
        return;
    }

    ui.push_id(id, |ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(60.0), table.columns.len())
            .max_scroll_height(max_height)
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for name in &table.columns {
                    header.col(|ui| {
                        ui.strong(name.as_str());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.rows.len(), |mut row| {
                    let values = &table.rows[row.index()];
                    for value in values {
                        row.col(|ui| {
                            if value.is_null() {
                                ui.weak("NULL");
                            } else {
                                ui.label(value.to_string());
                            }
                        });
                    }
                });
            });
    });
}
