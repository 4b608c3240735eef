// Copyright 2023 Remi Bernotavicius

//! Plain-text rendering of query results for the terminal.

use crate::database::{Database, Table};
use crate::insights::{Insight, Presentation};
use crate::Result;
use std::fmt::Write as _;
use thousands::Separable as _;

const BAR_WIDTH: usize = 40;

fn write_row<'a>(out: &mut String, row: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<_> = row
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

pub fn render_table(table: &Table) -> String {
    if table.is_empty() {
        return "(no rows)\n".into();
    }

    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain([name.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    write_row(&mut out, table.columns.iter().map(String::as_str), &widths);
    let rule: Vec<_> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &cells {
        write_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

/// One line per row, with a bar scaled against the largest value.
pub fn render_bars(table: &Table, label: &str, value: &str) -> String {
    let rows: Vec<(String, f64)> = (0..table.len())
        .map(|row| {
            (
                table.get(row, label).map(|v| v.to_string()).unwrap_or_default(),
                table.get(row, value).and_then(|v| v.as_f64()).unwrap_or(0.0),
            )
        })
        .collect();
    if rows.is_empty() {
        return "(no rows)\n".into();
    }

    let max = rows.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, v) in rows {
        let len = if max > 0.0 {
            (v / max * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(out, "{name:<label_width$} {} {v}", "#".repeat(len));
    }
    out
}

/// Each row's share of the total, as percentages.
pub fn render_shares(table: &Table, label: &str, value: &str) -> String {
    let total: f64 = table.column(value).iter().filter_map(|v| v.as_f64()).sum();
    if total == 0.0 {
        return "(no rows)\n".into();
    }
    let mut out = String::new();
    for row in 0..table.len() {
        let name = table.get(row, label).map(|v| v.to_string()).unwrap_or_default();
        let count = table.get(row, value).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let _ = writeln!(out, "{name}: {:.1}%", count * 100.0 / total);
    }
    out
}

pub fn render_insight(insight: &Insight, table: &Table) -> String {
    let body = match insight.presentation() {
        Presentation::Table => render_table(table),
        Presentation::Metric => match table.scalar().and_then(|v| v.as_i64()) {
            Some(n) => format!("{}\n", n.separate_with_commas()),
            None => format!("{}\n", table.scalar().map(|v| v.to_string()).unwrap_or_default()),
        },
        Presentation::Bar { label, value } => render_bars(table, label, value),
        Presentation::Pie { label, value } => render_shares(table, label, value),
    };
    format!("== {insight} ==\n{body}")
}

/// Every insight in catalog order, the contact lookup using `city`.
pub fn render_all(db: &Database, city: &str) -> Result<String> {
    let mut out = String::new();
    for mut insight in Insight::iter() {
        if let Insight::ProviderContacts { city: c } = &mut insight {
            *c = city.into();
        }
        let table = insight.fetch(db)?;
        out.push_str(&render_insight(&insight, &table));
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
fn sample() -> Table {
    use crate::database::{DynamicRow, Value};

    [("Completed", 3i64), ("Pending", 1)]
        .into_iter()
        .map(|(status, count)| DynamicRow {
            fields: vec![
                ("Status".into(), Value::from(status)),
                ("Count".into(), Value::from(count)),
            ],
        })
        .collect()
}

#[test]
fn table_is_aligned() {
    assert_eq!(
        render_table(&sample()),
        "Status    | Count\n\
         ----------+------\n\
         Completed | 3\n\
         Pending   | 1\n"
    );
    assert_eq!(render_table(&Table::default()), "(no rows)\n");
}

#[test]
fn bars_scale_to_largest() {
    let out = render_bars(&sample(), "Status", "Count");
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines[0], format!("Completed {} 3", "#".repeat(BAR_WIDTH)));
    assert_eq!(lines[1], format!("Pending   {} 1", "#".repeat(13)));
}

#[test]
fn shares_are_percentages() {
    assert_eq!(
        render_shares(&sample(), "Status", "Count"),
        "Completed: 75.0%\nPending: 25.0%\n"
    );
}

#[test]
fn metric_uses_separators() {
    use crate::database::{DynamicRow, Value};

    let table: Table = [DynamicRow {
        fields: vec![("Total_Quantity".into(), Value::Integer(12345))],
    }]
    .into_iter()
    .collect();
    assert_eq!(
        render_insight(&Insight::TotalQuantity, &table),
        "== Total Food Quantity Available ==\n12,345\n"
    );
}
