// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal fixed-width text table for `--output text` listings.

pub struct Column {
    pub header: &'static str,
    pub width: usize,
}

impl Column {
    pub const fn new(header: &'static str, width: usize) -> Self {
        Self { header, width }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn print(&self, out: &mut dyn std::io::Write) {
        let header: Vec<String> = self.columns.iter().map(|c| c.header.to_string()).collect();
        let _ = writeln!(out, "{}", crate::color::header(&self.format_row(&header)));
        for row in &self.rows {
            let _ = writeln!(out, "{}", self.format_row(row));
        }
    }

    fn format_row(&self, cells: &[String]) -> String {
        cells
            .iter()
            .zip(&self.columns)
            .map(|(cell, col)| format!("{:<width$}", truncate(cell, col.width), width = col.width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width || width < 2 {
        s.to_string()
    } else {
        let head: String = s.chars().take(width - 1).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_aligned_columns() {
        let mut table = Table::new(vec![Column::new("ID", 6), Column::new("TITLE", 10)]);
        table.push_row(vec!["tsk-1".into(), "fix bug".into()]);
        let mut buf = Vec::new();
        table.print(&mut buf);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("fix bug"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn truncates_long_cells_to_width() {
        let mut table = Table::new(vec![Column::new("TITLE", 5)]);
        table.push_row(vec!["a much longer title than fits".into()]);
        let mut buf = Vec::new();
        table.print(&mut buf);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.lines().nth(1).unwrap().trim_end().chars().count() <= 5);
    }
}
