// Copyright 2023 Remi Bernotavicius

use crate::database::{Database, Value};
use crate::import::{self, TableKind};
use crate::insights::{Insight, ListingFilter, Presentation};
use derive_more::Display;
use eframe::egui;
use std::collections::HashMap;
use strum::EnumIter;
use thousands::Separable as _;

mod chart;
mod query;
mod table_view;

const TABLE_HEIGHT: f32 = 400.0;
const INSIGHT_TABLE_HEIGHT: f32 = 200.0;

pub fn new_error_toast(text: impl Into<egui::WidgetText>) -> egui_toast::Toast {
    egui_toast::Toast {
        kind: egui_toast::ToastKind::Error,
        text: text.into(),
        options: egui_toast::ToastOptions::default()
            .duration_in_seconds(5.0)
            .show_progress(true),
        ..Default::default()
    }
}

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq)]
enum Section {
    #[display("Dashboard")]
    Dashboard,
    #[display("Providers")]
    Providers,
    #[display("Receivers")]
    Receivers,
    #[display("Food Listings")]
    FoodListings,
    #[display("Claims")]
    Claims,
    #[display("SQL Insights")]
    SqlInsights,
}

impl Section {
    fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

pub struct FoodDonationDashboard {
    db: Database,
    cache: query::QueryCache,
    section: Section,
    city: Option<String>,
    expiring_within_days: u64,
    listing_filter: ListingFilter,
    new_rows: HashMap<TableKind, Vec<String>>,
    delete_ids: HashMap<TableKind, String>,
    error: Option<String>,
    toasts: egui_toast::Toasts,
}

impl FoodDonationDashboard {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: Default::default(),
            section: Section::Dashboard,
            city: None,
            expiring_within_days: 2,
            listing_filter: Default::default(),
            new_rows: Default::default(),
            delete_ids: Default::default(),
            error: None,
            toasts: egui_toast::Toasts::new()
                .anchor(egui::Align2::RIGHT_BOTTOM, (-10.0, -10.0))
                .direction(egui::Direction::BottomUp),
        }
    }

    fn update_menu(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("menu").show(ctx, |ui| {
            ui.heading("Menu");
            ui.separator();
            for section in Section::iter() {
                ui.selectable_value(&mut self.section, section, section.to_string());
            }
            ui.separator();
            if ui.button("Refresh").clicked() {
                self.cache.clear();
                self.error = None;
            }
        });
    }

    fn update_dashboard(&mut self, ui: &mut egui::Ui) -> crate::Result<()> {
        ui.heading("Dashboard Overview");
        let totals = self.cache.totals(&self.db)?;
        ui.columns(4, |columns| {
            for (column, (name, count)) in columns.iter_mut().zip([
                ("Providers", totals.providers),
                ("Receivers", totals.receivers),
                ("Food Listings", totals.food_listings),
                ("Claims", totals.claims),
            ]) {
                column.label(name);
                column.heading(count.separate_with_commas());
            }
        });
        ui.separator();

        ui.strong(format!(
            "Completed claims: {}",
            totals.completed_claims.separate_with_commas()
        ));
        egui::Grid::new("status shares").num_columns(2).show(ui, |ui| {
            let shares = self.cache.status_shares(&self.db)?;
            for share in shares {
                ui.label(share.status.as_deref().unwrap_or("(none)"));
                ui.add(
                    egui::ProgressBar::new((share.percent / 100.0) as f32)
                        .desired_width(320.0)
                        .text(format!("{} ({:.1}%)", share.count, share.percent)),
                );
                ui.end_row();
            }
            crate::Result::Ok(())
        })
        .inner?;
        ui.separator();

        ui.horizontal(|ui| {
            ui.strong("Expiring within");
            ui.add(egui::Slider::new(&mut self.expiring_within_days, 0..=30).text("days"));
        });
        let today = chrono::Local::now().date_naive();
        let expiring = self
            .cache
            .expiring_listings(&self.db, today, self.expiring_within_days)?;
        if expiring.is_empty() {
            ui.label("Nothing expiring soon.");
        }
        egui::Grid::new("expiring").striped(true).show(ui, |ui| {
            for (expiry, listing) in expiring {
                ui.label(expiry.to_string());
                ui.label(listing.food_name.as_deref().unwrap_or_default());
                ui.label(
                    listing
                        .quantity
                        .map(|q| q.to_string())
                        .unwrap_or_default(),
                );
                ui.label(listing.location.as_deref().unwrap_or_default());
                ui.end_row();
            }
        });
        Ok(())
    }

    fn update_add_form(&mut self, ui: &mut egui::Ui, table: TableKind) {
        let values = self
            .new_rows
            .entry(table)
            .or_insert_with(|| vec![String::new(); table.columns().len()]);

        let mut add = false;
        ui.collapsing(format!("Add to {}", self.section), |ui| {
            egui::Grid::new(("add", table)).num_columns(2).show(ui, |ui| {
                for (column, value) in table.columns().iter().zip(values.iter_mut()) {
                    ui.label(column.replace('_', " "));
                    ui.add(egui::TextEdit::singleline(value).hint_text(*column));
                    ui.end_row();
                }
            });
            add = ui.button("Add").clicked();
        });
        if !add {
            return;
        }

        let result = import::parse_row(table, values)
            .map_err(crate::Error::from)
            .and_then(|record| self.db.upsert(&record));
        match result {
            Ok(()) => {
                log::info!("Added a row to {table}");
                values.iter_mut().for_each(String::clear);
                self.cache.clear();
            }
            Err(error) => {
                self.toasts.add(new_error_toast(error.to_string()));
            }
        }
    }

    fn update_delete_form(&mut self, ui: &mut egui::Ui, table: TableKind) {
        let id = self.delete_ids.entry(table).or_default();

        let mut delete = false;
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut *id).hint_text(table.key_column()));
            delete = ui
                .add_enabled(!id.trim().is_empty(), egui::Button::new("Delete"))
                .clicked();
        });
        if !delete {
            return;
        }

        match self.db.execute(&table.delete_sql(), &[id.trim().into()]) {
            Ok(0) => {
                self.toasts
                    .add(new_error_toast(format!("No row in {table} with that ID")));
            }
            Ok(_) => {
                log::info!("Deleted {} from {table}", id.trim());
                id.clear();
                self.cache.clear();
            }
            Err(error) => {
                self.toasts.add(new_error_toast(error.to_string()));
            }
        }
    }

    fn update_listing_filter(&mut self, ui: &mut egui::Ui) -> crate::Result<()> {
        ui.horizontal(|ui| {
            for (column, selected) in self.listing_filter.choices_mut() {
                let choices: Vec<String> = self
                    .cache
                    .fetch_all(&self.db, &ListingFilter::choices_sql(column), &[])?
                    .column(column)
                    .into_iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect();
                egui::ComboBox::from_label(column.replace('_', " "))
                    .selected_text(selected.clone().unwrap_or_else(|| "All".into()))
                    .show_ui(ui, |ui| {
                        ui.selectable_value(selected, None, "All");
                        for choice in choices {
                            ui.selectable_value(selected, Some(choice.clone()), choice);
                        }
                    });
            }
            crate::Result::Ok(())
        })
        .inner
    }

    fn update_table_section(&mut self, ui: &mut egui::Ui, table: TableKind) -> crate::Result<()> {
        ui.heading(self.section.to_string());
        self.update_add_form(ui, table);
        self.update_delete_form(ui, table);

        let (sql, params) = if table == TableKind::FoodListings {
            self.update_listing_filter(ui)?;
            (self.listing_filter.sql(), self.listing_filter.params())
        } else {
            (format!("SELECT * FROM {table}"), vec![])
        };
        let rows = self.cache.fetch_all(&self.db, &sql, &params)?;
        ui.label(format!("{} rows", rows.len().separate_with_commas()));
        table_view::show(ui, table, rows, TABLE_HEIGHT);
        Ok(())
    }

    fn update_insight(&mut self, ui: &mut egui::Ui, insight: &Insight) -> crate::Result<()> {
        let table = self
            .cache
            .fetch_all(&self.db, insight.sql(), &insight.params())?;
        match insight.presentation() {
            Presentation::Table => table_view::show(ui, insight, table, INSIGHT_TABLE_HEIGHT),
            Presentation::Metric => {
                let value = table.scalar().map(|v| match v.as_i64() {
                    Some(n) => n.separate_with_commas(),
                    None => v.to_string(),
                });
                ui.heading(value.unwrap_or_default());
            }
            Presentation::Bar { label, value } => chart::bars(ui, insight, table, label, value),
            Presentation::Pie { label, value } => chart::shares(ui, insight, table, label, value),
        }
        Ok(())
    }

    fn update_insights(&mut self, ui: &mut egui::Ui) -> crate::Result<()> {
        ui.heading("SQL Insights & Analysis");
        egui::ScrollArea::vertical()
            .auto_shrink(false)
            .show(ui, |ui| {
                for (number, mut insight) in Insight::iter().enumerate() {
                    ui.separator();
                    ui.strong(format!("{}. {insight}", number + 1));

                    if let Insight::ProviderContacts { city } = &mut insight {
                        let cities = self.cache.provider_cities(&self.db)?.to_vec();
                        if self.city.is_none() {
                            self.city = cities.first().cloned();
                        }
                        egui::ComboBox::from_label("Select City")
                            .selected_text(self.city.clone().unwrap_or_default())
                            .show_ui(ui, |ui| {
                                for c in cities {
                                    ui.selectable_value(&mut self.city, Some(c.clone()), c);
                                }
                            });
                        *city = self.city.clone().unwrap_or_default();
                    }

                    self.update_insight(ui, &insight)?;
                }
                crate::Result::Ok(())
            })
            .inner
    }

    fn update_section(&mut self, ui: &mut egui::Ui) -> crate::Result<()> {
        match self.section {
            Section::Dashboard => self.update_dashboard(ui),
            Section::Providers => self.update_table_section(ui, TableKind::Providers),
            Section::Receivers => self.update_table_section(ui, TableKind::Receivers),
            Section::FoodListings => self.update_table_section(ui, TableKind::FoodListings),
            Section::Claims => self.update_table_section(ui, TableKind::Claims),
            Section::SqlInsights => self.update_insights(ui),
        }
    }

    fn update_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Food Wastage Management System");
            ui.separator();

            if let Some(error) = &self.error {
                ui.label(format!("Couldn't load this section: {error}"));
                if ui.button("Retry").clicked() {
                    self.cache.clear();
                    self.error = None;
                }
                return;
            }

            if let Err(error) = self.update_section(ui) {
                log::warn!("{} failed: {error}", self.section);
                self.toasts.add(new_error_toast(error.to_string()));
                self.error = Some(error.to_string());
            }
        });
    }
}

impl eframe::App for FoodDonationDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_menu(ctx);
        self.update_central_panel(ctx);
        self.toasts.show(ctx);
    }
}
