use anyhow::Result;
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use varmap_cli::pipeline::UploadStep;
use varmap_core::{MergeSummary, SessionContext};
use varmap_model::Row;
use varmap_model::columns::{GROUP, ORGAN_SYSTEM, SOURCE, VARIABLE};
use varmap_report::ExportView;

/// Preview rows shown before the table is cut off.
const PREVIEW_LIMIT: usize = 25;

pub fn print_tree(session: &SessionContext) {
    let build = session.tree();
    let selection = session.selection();
    for organ in &build.tree.roots {
        println!("{}", organ.label);
        for group in &organ.children {
            println!("  {}", group.label);
            for leaf in &group.children {
                let selected = build
                    .lookup
                    .get(&leaf.value)
                    .and_then(|row| row.key.as_ref())
                    .is_some_and(|key| selection.contains(key));
                let marker = if selected { "[x]" } else { "[ ]" };
                println!("    {marker} {}  {}", leaf.label, leaf.value);
            }
        }
    }
    println!(
        "{} variables, {} selected",
        build.tree.leaf_count(),
        session.selected_rows().len()
    );
}

pub fn print_upload_summary(steps: &[UploadStep]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Added"),
        header_cell("Updated"),
        header_cell("Skipped"),
        header_cell("Ambiguous"),
        header_cell("Blank"),
        header_cell("Selected"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total = MergeSummary::default();
    let mut total_selected = 0usize;
    for step in steps {
        let summary = &step.report.summary;
        total.added += summary.added;
        total.updated += summary.updated;
        total.skipped += summary.skipped;
        total.ambiguous += summary.ambiguous;
        total.blank += summary.blank;
        total_selected += step.report.selected;
        let name = step
            .path
            .file_name()
            .map_or_else(|| step.path.display().to_string(), |name| {
                name.to_string_lossy().to_string()
            });
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue),
            count_cell(summary.added, Color::Green),
            count_cell(summary.updated, Color::Yellow),
            Cell::new(summary.skipped),
            count_cell(summary.ambiguous, Color::Red),
            Cell::new(summary.blank),
            Cell::new(step.report.selected),
        ]);
    }
    if steps.len() > 1 {
        table.add_row(vec![
            Cell::new("TOTAL")
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new(total.added).add_attribute(Attribute::Bold),
            Cell::new(total.updated).add_attribute(Attribute::Bold),
            Cell::new(total.skipped).add_attribute(Attribute::Bold),
            Cell::new(total.ambiguous).add_attribute(Attribute::Bold),
            Cell::new(total.blank).add_attribute(Attribute::Bold),
            Cell::new(total_selected).add_attribute(Attribute::Bold),
        ]);
    }
    println!("{table}");
}

pub fn print_selection_reference(session: &SessionContext) {
    match session.selection().serialize() {
        Some(reference) => println!("Selection: {reference}"),
        None => println!("Selection: (empty)"),
    }
}

pub fn print_export_preview(view: &ExportView) {
    if view.is_empty() {
        println!("No rows selected.");
        return;
    }
    let mut table = Table::new();
    table.set_header(
        view.columns()
            .iter()
            .map(|column| header_cell(column))
            .collect::<Vec<_>>(),
    );
    apply_table_style(&mut table);
    for record in view.records().iter().take(PREVIEW_LIMIT) {
        table.add_row(record.iter().map(|value| display_cell(value)).collect::<Vec<_>>());
    }
    println!("{table}");
    if view.len() > PREVIEW_LIMIT {
        println!("... {} more rows", view.len() - PREVIEW_LIMIT);
    }
    println!("{} rows selected for export", view.len());
}

pub fn print_remote_rows(rows: &[Row]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell(VARIABLE),
        header_cell(ORGAN_SYSTEM),
        header_cell(GROUP),
        header_cell(SOURCE),
        header_cell("Row key"),
    ]);
    apply_table_style(&mut table);
    for row in rows {
        table.add_row(vec![
            display_cell(row.variable().unwrap_or_default()),
            display_cell(row.organ_system().unwrap_or_default()),
            display_cell(row.group().unwrap_or_default()),
            display_cell(row.source().unwrap_or_default()),
            Cell::new(row.key.as_ref().map(ToString::to_string).unwrap_or_default())
                .fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!("{} rows", rows.len());
}

pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count).fg(color)
    }
}

fn display_cell(value: &str) -> Cell {
    if value.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(value)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}
