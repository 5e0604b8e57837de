//! Styled output helpers and tables for the console renderer and CLI.

use console::{measure_text_width, pad_str, style};

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", style("→").cyan(), message);
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

// ============================================================================
// Table output
// ============================================================================

/// Column alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
}

impl From<Alignment> for console::Alignment {
    fn from(align: Alignment) -> Self {
        match align {
            Alignment::Left => Self::Left,
            Alignment::Right => Self::Right,
            Alignment::Center => Self::Center,
        }
    }
}

/// A markdown-style table. Cell widths are measured in terminal columns,
/// so styled or wide cells still line up.
#[derive(Clone, Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; headers.len()],
        }
    }

    /// Set column alignments; missing columns stay left-aligned.
    #[must_use]
    pub fn with_alignments(mut self, alignments: &[Alignment]) -> Self {
        for (slot, align) in self.alignments.iter_mut().zip(alignments) {
            *slot = *align;
        }
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a markdown table. Extra cells beyond the headers are
    /// dropped.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(measure_text_width(cell));
            }
        }

        let mut output = String::from("|");
        for (header, &width) in self.headers.iter().zip(&widths) {
            output.push(' ');
            output.push_str(&pad_str(header, width, console::Alignment::Center, None));
            output.push_str(" |");
        }
        output.push('\n');

        output.push('|');
        for (&width, &align) in widths.iter().zip(&self.alignments) {
            let dashes = "-".repeat(width);
            let sep = match align {
                Alignment::Left => format!(":{dashes}-|"),
                Alignment::Right => format!("-{dashes}:|"),
                Alignment::Center => format!(":{dashes}:|"),
            };
            output.push_str(&sep);
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, &width) in widths.iter().enumerate() {
                let cell = row.get(i).map_or("", String::as_str);
                output.push(' ');
                output.push_str(&pad_str(cell, width, self.alignments[i].into(), None));
                output.push_str(" |");
            }
            output.push('\n');
        }

        output
    }
}
