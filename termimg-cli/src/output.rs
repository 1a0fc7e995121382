// ABOUTME: This module handles output formatting for the termimg CLI
// ABOUTME: Info reports and method listings as colored tables or JSON

use crate::detection::Detection;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termimg_sdk::{CellSize, WindowGeometry};

/// Everything `termimg info` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoReport {
    pub terminal: String,
    pub method: Option<String>,
    pub forced: bool,
    pub window: Option<WindowGeometry>,
    pub cell: Option<CellSize>,
}

impl InfoReport {
    pub fn new(detection: Detection, window: Option<WindowGeometry>) -> Self {
        Self {
            terminal: detection.terminal,
            method: detection.method,
            forced: detection.forced,
            cell: window.map(|w| w.cell_size()),
            window,
        }
    }
}

pub trait OutputFormat {
    fn format_info(&self, report: &InfoReport) -> Result<String>;
    fn format_methods(&self, keys: &[&str], detected: Option<&str>) -> Result<String>;
}

pub struct TableFormatter {
    use_color: bool,
}

impl TableFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn missing(&self, text: &str) -> String {
        if self.use_color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn highlight(&self, text: &str) -> String {
        if self.use_color {
            text.green().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct MethodRow {
    #[tabled(rename = "Method")]
    key: String,
    #[tabled(rename = "Detected")]
    detected: String,
}

impl OutputFormat for TableFormatter {
    fn format_info(&self, report: &InfoReport) -> Result<String> {
        let method = match (&report.method, report.forced) {
            (Some(method), true) => format!("{} (forced)", self.highlight(method)),
            (Some(method), false) => self.highlight(method),
            (None, _) => self.missing("none"),
        };
        let window = match report.window {
            Some(w) => format!(
                "{}x{} cells, {}x{} px",
                w.columns, w.rows, w.width_px, w.height_px
            ),
            None => self.missing("unavailable"),
        };
        let cell = match report.cell {
            Some(cell) if !cell.is_zero() => format!("{}x{} px", cell.width, cell.height),
            _ => self.missing("unknown"),
        };

        let rows = vec![
            PropertyRow {
                name: "Terminal",
                value: report.terminal.clone(),
            },
            PropertyRow {
                name: "Method",
                value: method,
            },
            PropertyRow {
                name: "Window",
                value: window,
            },
            PropertyRow {
                name: "Cell",
                value: cell,
            },
        ];

        let mut table = Table::new(rows);
        table.with(Style::psql());
        Ok(table.to_string())
    }

    fn format_methods(&self, keys: &[&str], detected: Option<&str>) -> Result<String> {
        let rows: Vec<MethodRow> = keys
            .iter()
            .map(|key| MethodRow {
                key: key.to_string(),
                detected: if Some(*key) == detected {
                    self.highlight("yes")
                } else {
                    String::new()
                },
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::psql());
        Ok(table.to_string())
    }
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

#[derive(Serialize)]
struct MethodEntry<'a> {
    key: &'a str,
    detected: bool,
}

impl OutputFormat for JsonFormatter {
    fn format_info(&self, report: &InfoReport) -> Result<String> {
        self.render(report)
    }

    fn format_methods(&self, keys: &[&str], detected: Option<&str>) -> Result<String> {
        let entries: Vec<MethodEntry<'_>> = keys
            .iter()
            .map(|&key| MethodEntry {
                key,
                detected: Some(key) == detected,
            })
            .collect();
        self.render(&entries)
    }
}
