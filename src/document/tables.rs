//! Heuristic table detection from positioned text.
//!
//! The detector needs no ML model, only the bounding boxes pdfium reports
//! for each text span:
//! 1. Cluster cells into rows by vertical centre alignment
//! 2. Find runs of consecutive rows with a similar column count
//! 3. Derive column boundaries from the left edges across the run
//! 4. Assign cells to columns and emit a [`Table`]
//!
//! Missed tables are expected: ruled tables with merged cells or prose laid
//! out in columns defeat the alignment rules, and that is accepted.

use crate::document::{BoundingBox, Table, TypedSpan};
use std::cmp::Ordering;

/// A piece of text with its position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextCell {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }

    fn center_x(&self) -> f32 {
        (self.bbox.left + self.bbox.right) / 2.0
    }

    fn center_y(&self) -> f32 {
        (self.bbox.bottom + self.bbox.top) / 2.0
    }
}

/// Detector thresholds, in PDF points.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Cells whose vertical centres differ by at most this share a row.
    pub row_tolerance: f32,
    /// Left edges closer than this belong to the same column.
    pub col_tolerance: f32,
    pub min_cells: usize,
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 5.0,
            col_tolerance: 10.0,
            min_cells: 6,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

/// Cells for every non-blank span that carries a bounding box.
pub fn cells_from_spans(spans: &[TypedSpan]) -> Vec<TextCell> {
    spans
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .filter_map(|s| s.bbox.map(|bbox| TextCell::new(s.text.clone(), bbox)))
        .collect()
}

/// Detect tables among a page's positioned spans.
pub fn detect_tables_in_spans(spans: &[TypedSpan], config: &TableDetectorConfig) -> Vec<Table> {
    detect_tables(&cells_from_spans(spans), config)
}

/// Detect tables among the given cells.
pub fn detect_tables(cells: &[TextCell], config: &TableDetectorConfig) -> Vec<Table> {
    let cells: Vec<&TextCell> = cells.iter().filter(|c| !c.text.trim().is_empty()).collect();
    if cells.len() < config.min_cells {
        return Vec::new();
    }

    let rows = cluster_rows(&cells, config);
    find_table_regions(&rows, config)
        .iter()
        .filter_map(|region| build_table(region, config))
        .collect()
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Group cells into rows, top of the page first, cells left to right.
fn cluster_rows<'a>(cells: &[&'a TextCell], config: &TableDetectorConfig) -> Vec<Vec<&'a TextCell>> {
    let mut rows: Vec<Vec<&TextCell>> = Vec::new();

    for &cell in cells {
        let found = rows.iter().position(|row| {
            row.first()
                .is_some_and(|first| (cell.center_y() - first.center_y()).abs() <= config.row_tolerance)
        });
        match found {
            Some(i) => rows[i].push(cell),
            None => rows.push(vec![cell]),
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| cmp_f32(a.bbox.left, b.bbox.left));
    }
    // PDF y grows upwards, so the top row has the largest centre.
    rows.sort_by(|a, b| {
        let ay = a.first().map(|c| c.center_y()).unwrap_or(0.0);
        let by = b.first().map(|c| c.center_y()).unwrap_or(0.0);
        cmp_f32(by, ay)
    });
    rows
}

/// Runs of consecutive multi-cell rows whose cell counts differ by at most one.
fn find_table_regions<'a>(
    rows: &[Vec<&'a TextCell>],
    config: &TableDetectorConfig,
) -> Vec<Vec<Vec<&'a TextCell>>> {
    let mut regions = Vec::new();
    let mut current: Vec<Vec<&TextCell>> = Vec::new();
    let mut expected_cols: Option<usize> = None;

    for row in rows {
        let num_cells = row.len();
        if num_cells < config.min_cols {
            close_region(&mut current, &mut regions, config.min_rows);
            expected_cols = None;
            continue;
        }
        match expected_cols {
            Some(exp) if num_cells.abs_diff(exp) <= 1 => current.push(row.clone()),
            _ => {
                close_region(&mut current, &mut regions, config.min_rows);
                current.push(row.clone());
                expected_cols = Some(num_cells);
            }
        }
    }
    close_region(&mut current, &mut regions, config.min_rows);
    regions
}

fn close_region<'a>(
    current: &mut Vec<Vec<&'a TextCell>>,
    regions: &mut Vec<Vec<Vec<&'a TextCell>>>,
    min_rows: usize,
) {
    if current.len() >= min_rows {
        regions.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

fn build_table(region: &[Vec<&TextCell>], config: &TableDetectorConfig) -> Option<Table> {
    let boundaries = column_boundaries(region, config);
    let num_cols = boundaries.len().saturating_sub(1);
    if num_cols < config.min_cols {
        return None;
    }

    let rows = region
        .iter()
        .map(|row| {
            let mut out = vec![String::new(); num_cols];
            for cell in row {
                let col = column_index(cell, &boundaries).min(num_cols - 1);
                let text = cell.text.trim();
                if out[col].is_empty() {
                    out[col] = text.to_string();
                } else {
                    out[col].push(' ');
                    out[col].push_str(text);
                }
            }
            out
        })
        .collect::<Vec<_>>();

    let filled = rows.iter().flatten().filter(|c| !c.is_empty()).count();
    (filled >= config.min_cells).then_some(Table { rows })
}

/// Clustered left edges, plus the right edge of the widest cell.
fn column_boundaries(region: &[Vec<&TextCell>], config: &TableDetectorConfig) -> Vec<f32> {
    let mut xs: Vec<f32> = region
        .iter()
        .flat_map(|row| row.iter().map(|c| c.bbox.left))
        .collect();
    xs.sort_by(|a, b| cmp_f32(*a, *b));

    let Some(&first) = xs.first() else {
        return Vec::new();
    };
    let mut boundaries = vec![first];
    for &x in &xs[1..] {
        if boundaries.last().is_some_and(|&last| x - last > config.col_tolerance) {
            boundaries.push(x);
        }
    }

    if let Some(max_right) = region
        .iter()
        .flat_map(|row| row.iter().map(|c| c.bbox.right))
        .max_by(|a, b| cmp_f32(*a, *b))
    {
        boundaries.push(max_right);
    }
    boundaries
}

fn column_index(cell: &TextCell, boundaries: &[f32]) -> usize {
    let center = cell.center_x();
    boundaries
        .windows(2)
        .position(|w| center >= w[0] && center < w[1])
        .unwrap_or_else(|| boundaries.len().saturating_sub(2))
}
