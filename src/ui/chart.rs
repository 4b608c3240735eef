use crate::database::Table;
use eframe::egui;

const BAR_WIDTH: f32 = 320.0;

fn labelled_values(table: &Table, label: &str, value: &str) -> Vec<(String, f64)> {
    (0..table.len())
        .map(|row| {
            (
                table
                    .get(row, label)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                table.get(row, value).and_then(|v| v.as_f64()).unwrap_or(0.0),
            )
        })
        .collect()
}

/// Horizontal bars, each scaled against the largest value.
pub fn bars(ui: &mut egui::Ui, id: impl std::hash::Hash, table: &Table, label: &str, value: &str) {
    let rows = labelled_values(table, label, value);
    if rows.is_empty() {
        ui.label("No rows.");
        return;
    }

    let max = rows.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    egui::Grid::new(id).num_columns(2).show(ui, |ui| {
        for (name, v) in rows {
            let fraction = if max > 0.0 { (v / max) as f32 } else { 0.0 };
            ui.label(name);
            ui.add(
                egui::ProgressBar::new(fraction)
                    .desired_width(BAR_WIDTH)
                    .text(format!("{v}")),
            );
            ui.end_row();
        }
    });
}

/// Each row's share of the column total, with its percentage.
pub fn shares(ui: &mut egui::Ui, id: impl std::hash::Hash, table: &Table, label: &str, value: &str) {
    let rows = labelled_values(table, label, value);
    let total: f64 = rows.iter().map(|(_, v)| v).sum();
    if total == 0.0 {
        ui.label("No rows.");
        return;
    }

    egui::Grid::new(id).num_columns(2).show(ui, |ui| {
        for (name, v) in rows {
            let fraction = v / total;
            ui.label(name);
            ui.add(
                egui::ProgressBar::new(fraction as f32)
                    .desired_width(BAR_WIDTH)
                    .text(format!("{:.1}%", fraction * 100.0)),
            );
            ui.end_row();
        }
    });
}
