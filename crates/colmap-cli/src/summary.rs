//! Terminal tables for schemas, samples, mappings and run results.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use colmap_approval::format_confidence;
use colmap_exec::{ExecutionOutcome, ExecutionReport};
use colmap_guard::{ConfidenceBand, ConfidenceThresholds};
use colmap_model::{MappingSet, RiskAssessment, RiskLevel, SchemaSnapshot};
use colmap_warehouse::SampleRows;
use serde_json::Value;

pub fn schema_table(snapshot: &SchemaSnapshot) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("#"),
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Nullable"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for schema in &snapshot.tables {
        for (index, column) in schema.columns.iter().enumerate() {
            let table_cell = if index == 0 {
                Cell::new(&schema.table_name)
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                table_cell,
                Cell::new(column.ordinal),
                Cell::new(&column.name),
                Cell::new(&column.declared_type),
                if column.nullable {
                    Cell::new("yes")
                } else {
                    dim_cell("no")
                },
            ]);
        }
    }
    table
}

pub fn sample_table(rows: &SampleRows) -> Table {
    let mut table = Table::new();
    table.set_header(rows.columns.iter().map(|c| header_cell(c)));
    apply_table_style(&mut table);
    for row in &rows.rows {
        table.add_row(rows.columns.iter().map(|column| match row.get(column) {
            None | Some(Value::Null) => dim_cell("NULL"),
            Some(Value::String(s)) => Cell::new(s),
            Some(other) => Cell::new(other),
        }));
    }
    table
}

pub fn mapping_table(set: &MappingSet, thresholds: &ConfidenceThresholds) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target"),
        header_cell("Type"),
        header_cell("Source"),
        header_cell("Confidence"),
        header_cell("Transform"),
        header_cell("Rule"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for candidate in &set.mappings {
        let source = match &candidate.source_column {
            Some(source) => Cell::new(source),
            None => Cell::new("(unmapped)").fg(Color::Yellow),
        };
        let confidence = if candidate.is_mapped() {
            confidence_cell(candidate.confidence, thresholds)
        } else {
            dim_cell(format_confidence(candidate.confidence))
        };
        table.add_row(vec![
            Cell::new(&candidate.target_column).add_attribute(Attribute::Bold),
            Cell::new(&candidate.target_type),
            source,
            confidence,
            match candidate.rendered_transform() {
                Some(expression) => Cell::new(expression),
                None => dim_cell("direct"),
            },
            match candidate.rule {
                Some(rule) => Cell::new(rule.description()),
                None => dim_cell("-"),
            },
        ]);
    }
    table
}

/// One-line mapping statistics.
pub fn mapping_overview(set: &MappingSet) -> String {
    format!(
        "{} -> {}: {} of {} columns mapped, average confidence {}",
        set.source_table,
        set.target_table,
        set.stats.mapped_count,
        set.mappings.len(),
        format_confidence(set.stats.average_confidence)
    )
}

pub fn risk_report(risk: &RiskAssessment) -> String {
    let mut out = format!("Risk: {} ({})", risk.risk_level, risk.operation.as_str());
    for factor in &risk.risk_factors {
        out.push_str(&format!("\n  - {factor}"));
    }
    for mitigation in &risk.mitigations {
        out.push_str(&format!("\n  * {mitigation}"));
    }
    out.push_str(&format!("\n{}", risk.recommendation));
    out
}

pub fn execution_table(reports: &[ExecutionReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mode"),
        header_cell("Statement"),
        header_cell("Bytes"),
        header_cell("Rows"),
        header_cell("Job"),
        header_cell("Risk"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for report in reports {
        let (mode, rows, job) = match &report.outcome {
            ExecutionOutcome::Validated { .. } => ("dry run", dim_cell("-"), dim_cell("-")),
            ExecutionOutcome::Executed {
                job_id,
                rows_affected,
                ..
            } => ("live", Cell::new(rows_affected), Cell::new(job_id)),
        };
        table.add_row(vec![
            Cell::new(mode),
            Cell::new(report.variant),
            Cell::new(report.outcome.bytes_processed()),
            rows,
            job,
            risk_cell(report.risk_assessment.risk_level),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn confidence_cell(confidence: f64, thresholds: &ConfidenceThresholds) -> Cell {
    let cell = Cell::new(format_confidence(confidence));
    match thresholds.categorize(confidence) {
        ConfidenceBand::High => cell.fg(Color::Green),
        ConfidenceBand::Medium => cell.fg(Color::Yellow),
        ConfidenceBand::Low => cell.fg(Color::Red),
    }
}

fn risk_cell(level: RiskLevel) -> Cell {
    let cell = Cell::new(level);
    match level {
        RiskLevel::Low => cell.fg(Color::Green),
        RiskLevel::Medium => cell.fg(Color::Yellow),
        RiskLevel::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
