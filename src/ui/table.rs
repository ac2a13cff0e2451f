//! Console tables for experiment summaries and the loss registry.

use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::aggregate::ExperimentReport;
use crate::registry::{LossRegistry, LossSource};
use crate::stats::LossStat;

const NO_DATA: &str = "n/a";

fn number(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{:.2}", v)).set_alignment(CellAlignment::Right),
        None => Cell::new(NO_DATA).fg(Color::DarkGrey).set_alignment(CellAlignment::Right),
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// One row per non-empty metric: sample count, moments and last value.
pub fn report_table(report: &ExperimentReport) -> Table {
    let mut table = new_table(vec!["Trace", "Metric", "Unit", "Points", "Mean", "Std dev", "CV", "Last"]);

    for section in report.sections.values() {
        for data in section.iter().filter(|d| !d.is_empty()) {
            let summary = data.summary;
            table.add_row(vec![
                Cell::new(section.format.name()),
                Cell::new(data.key().name()),
                Cell::new(data.key().unit().label()),
                Cell::new(data.points().len()).set_alignment(CellAlignment::Right),
                number(summary.map(|m| m.mean)),
                number(summary.map(|m| m.std_dev())),
                number(summary.and_then(|m| m.var_coeff)),
                number(data.last().map(|p| p.value)),
            ]);
        }
    }
    table
}

fn loss_cells(stat: Option<LossStat>) -> [Cell; 2] {
    match stat {
        Some(s) => {
            let pct = s.percentage();
            let color = match pct {
                Some(p) if p >= 5.0 => Color::Red,
                Some(p) if p >= 1.0 => Color::Yellow,
                Some(_) => Color::Green,
                None => Color::DarkGrey,
            };
            [
                Cell::new(format!("{}/{}", s.loss, s.sent)).set_alignment(CellAlignment::Right),
                number(pct).fg(color),
            ]
        }
        None => [Cell::new(NO_DATA).fg(Color::DarkGrey), Cell::new(NO_DATA).fg(Color::DarkGrey)],
    }
}

/// One row per registered experiment, relay and protocol loss side by side.
pub fn loss_table(registry: &LossRegistry, label: &dyn Fn(&Path) -> String) -> Table {
    let mut table = new_table(vec!["Experiment", "Relay lost/sent", "Relay %", "QUIC lost/sent", "QUIC %"]);

    for (path, bars) in registry.snapshot() {
        let mut row = vec![Cell::new(label(&path))];
        row.extend(loss_cells(bars.get(LossSource::Relay)));
        row.extend(loss_cells(bars.get(LossSource::Protocol)));
        table.add_row(row);
    }
    table
}
