//! Generic column-oriented tables with deferred fixed-width rendering.
//!
//! A [`Table`] is an ordered collection of rows keyed by a closed set of
//! column identifiers (a [`ColumnSet`] enum per table kind). Rows hold
//! raw [`Cell`] values; rendering resolves each visible column's
//! renderer and lays the text out as a left-justified, whitespace
//! separated table. Sorting is a stable multi-key sort driven either by
//! explicit [`SortKey`]s or by the compact string form (`-nb,id`).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::Hash;

use chrono::NaiveDateTime;

use crate::{Error, Result};

/// Separator between rendered columns.
const COLUMN_SEP: &str = "  ";

/// Display format for [`Cell::Time`] values.
const TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw cell value, kept unrendered until the table is laid out.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveDateTime),
}

impl Cell {
    /// Default text rendering, used by columns without a custom format.
    pub fn plain(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Text(v) => v.clone(),
            Cell::Time(v) => v.format(TIME_DISPLAY_FORMAT).to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Total ordering across cell values.
    ///
    /// Same-variant values compare naturally (floats via `total_cmp`,
    /// so the order is deterministic even for NaN). Numeric variants
    /// compare with each other as floats; otherwise mixed variants
    /// order by a fixed variant rank so sorting never panics on
    /// heterogeneous columns.
    pub fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Float(a), Cell::Float(b)) => a.total_cmp(b),
            (Cell::Int(a), Cell::Float(b)) => (*a as f64).total_cmp(b),
            (Cell::Float(a), Cell::Int(b)) => a.total_cmp(&(*b as f64)),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Time(a), Cell::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Int(_) | Cell::Float(_) => 0,
            Cell::Text(_) => 1,
            Cell::Time(_) => 2,
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(v: NaiveDateTime) -> Self {
        Cell::Time(v)
    }
}

/// A transient row: column identifier to raw value.
pub type Row<C> = HashMap<C, Cell>;

/// The closed set of columns of one table kind.
///
/// Implemented by a small `Copy` enum per table; the registry is fixed
/// metadata (name, renderer, human description) independent of any
/// particular dataset, so unknown column names are caught when a sort
/// spec or column list is parsed rather than at render time.
pub trait ColumnSet: Copy + Eq + Hash + 'static {
    /// Every column of this table kind, in declaration order.
    const ALL: &'static [Self];

    /// Column name as written in sort specs and config files.
    fn name(self) -> &'static str;

    /// One-line human description, shown by `fw list-columns`.
    fn description(self) -> &'static str;

    /// Render a raw value for display.
    fn render(self, value: &Cell) -> String {
        value.plain()
    }

    /// Look a column up by name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// One key of a multi-key sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<C> {
    pub column: C,
    pub descending: bool,
}

/// Parse the compact sort string: comma-separated column names, each
/// optionally prefixed with `-` (descending) or `+` (ascending).
pub fn parse_sort_spec<C: ColumnSet>(spec: &str) -> Result<Vec<SortKey<C>>> {
    let mut keys = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        let (name, descending) = match part.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (part.strip_prefix('+').unwrap_or(part), false),
        };
        let column =
            C::from_name(name).ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        keys.push(SortKey { column, descending });
    }
    Ok(keys)
}

/// An ordered row collection with deferred rendering.
#[derive(Debug, Clone, Default)]
pub struct Table<C: ColumnSet> {
    rows: Vec<Row<C>>,
}

impl<C: ColumnSet> Table<C> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a row. Structural trust: callers provide the columns
    /// they intend to show; missing values render empty and sort
    /// before present ones.
    pub fn add_row(&mut self, row: Row<C>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row<C>] {
        &self.rows
    }

    /// Keep only rows where the predicate holds. Pure with respect to
    /// the surviving rows.
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Row<C>) -> bool,
    {
        self.rows.retain(|row| predicate(row));
    }

    /// Keep at most the first `limit` rows. A limit of zero means no
    /// limit.
    pub fn truncate(&mut self, limit: usize) {
        if limit > 0 {
            self.rows.truncate(limit);
        }
    }

    /// Stable multi-key sort.
    ///
    /// A single stable sort with a combined comparator: keys apply
    /// first-to-last, so the first key dominates and later keys break
    /// ties among equal earlier values. This reproduces the ordering
    /// of repeatedly applying a single-key stable sort per key in
    /// reverse key order; rows equal under every key retain their
    /// original relative order.
    pub fn sort(&mut self, keys: &[SortKey<C>]) {
        self.rows.sort_by(|a, b| {
            for key in keys {
                let ord = match (a.get(&key.column), b.get(&key.column)) {
                    (Some(x), Some(y)) => x.compare(y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Parse `spec` and sort by it.
    pub fn sort_by_spec(&mut self, spec: &str) -> Result<()> {
        let keys = parse_sort_spec::<C>(spec)?;
        self.sort(&keys);
        Ok(())
    }

    /// Render the given columns as fixed-width text.
    ///
    /// Two passes: first every cell is rendered and column widths are
    /// measured (max of header and all cell texts), then the lines are
    /// emitted left-justified with a two-space separator. A blank line
    /// separates the header from the body; the last column carries no
    /// trailing padding.
    pub fn render(&self, columns: &[C]) -> String {
        let headers: Vec<&str> = columns.iter().map(|c| c.name()).collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).map(|v| c.render(v)).unwrap_or_default())
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &body {
            for (i, text) in row.iter().enumerate() {
                widths[i] = widths[i].max(text.len());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &headers, &widths);
        out.push('\n');
        for row in &body {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str(COLUMN_SEP);
        }
        let _ = write!(line, "{:<width$}", cell.as_ref(), width = widths[i]);
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Count items per key, most frequent first.
///
/// Ties keep the first-seen order of their keys, so the result is
/// deterministic for identical input ordering.
pub fn count_by<I, K, F>(items: I, mut key: F) -> Vec<(K, usize)>
where
    I: IntoIterator,
    K: Eq + Hash + Clone,
    F: FnMut(&I::Item) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(k.clone(), counts.len());
                counts.push((k, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
