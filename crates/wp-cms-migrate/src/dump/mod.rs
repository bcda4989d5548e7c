//! Reading and parsing `mysqldump` output.
//!
//! The pipeline for one table is:
//!
//! 1. [`extract::InsertParser`] splits the dump into statements and slices out
//!    each tuple body of every `INSERT`
//! 2. [`tokenize::tokenize`] splits a body on top-level commas
//! 3. [`value::normalize`] unquotes and unescapes each field
//!
//! Step 1 runs once when the dump is loaded. [`Dump::rows`] runs the other two
//! on first use of a table and hands mappers [`Row`]s addressed through the
//! column layouts in [`layout`].

pub mod extract;
pub mod layout;
pub mod tokenize;
pub mod value;

use crate::error::{MigrateError, Result};
use extract::{Insert, InsertParser};
use layout::Column;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A SQL dump loaded into memory.
#[derive(Debug)]
pub struct Dump {
    path: PathBuf,
    text: String,
    /// `INSERT` statements per table name, in dump order.
    inserts: HashMap<String, Vec<Insert>>,
    /// Parsed rows per table name.
    parsed: Mutex<HashMap<String, Arc<Vec<Row>>>>,
}

impl Dump {
    /// Read a dump file.
    ///
    /// A missing file is [`MigrateError::DumpNotFound`]; invalid UTF-8 is
    /// replaced lossily with a warning.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MigrateError::DumpNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(MigrateError::Io(e)),
        };

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Dump {:?} is not valid UTF-8 (first bad byte at {}); invalid sequences replaced",
                    path,
                    e.utf8_error().valid_up_to()
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        let dump = Self::index(path.to_path_buf(), text)?;
        info!(
            "Read dump {:?}: {:.2} KB, {} tables with INSERT statements",
            path,
            dump.text.len() as f64 / 1024.0,
            dump.inserts.len()
        );
        Ok(dump)
    }

    /// Wrap dump text that is already in memory.
    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        Self::index(PathBuf::from("<memory>"), text.into())
    }

    fn index(path: PathBuf, text: String) -> Result<Self> {
        let mut inserts: HashMap<String, Vec<Insert>> = HashMap::new();
        for insert in InsertParser::new()?.inserts(&text) {
            inserts.entry(insert.table.clone()).or_default().push(insert);
        }
        Ok(Self {
            path,
            text,
            inserts,
            parsed: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the dump text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Raw tuple bodies for a fully qualified table name.
    pub fn tuples(&self, table: &str) -> Vec<&str> {
        self.inserts
            .get(table)
            .into_iter()
            .flatten()
            .flat_map(|insert| insert.tuples.iter())
            .map(|range| &self.text[range.clone()])
            .collect()
    }

    /// Normalized rows of the table described by `C`, under `prefix`.
    ///
    /// Rows are in stock column order even when a statement lists its
    /// columns in another order. Parsed once per table.
    pub fn rows<C: Column>(&self, prefix: &str) -> Arc<Vec<Row>> {
        let table = format!("{}{}", prefix, C::TABLE);
        if let Some(rows) = self.parsed().get(&table) {
            return Arc::clone(rows);
        }

        let mut rows = Vec::new();
        for insert in self.inserts.get(&table).into_iter().flatten() {
            let order = insert
                .columns
                .as_deref()
                .and_then(|listed| stock_order::<C>(&table, listed));
            for range in &insert.tuples {
                let row = Row::parse(&self.text[range.clone()]);
                rows.push(match &order {
                    Some(order) => row.reorder(order),
                    None => row,
                });
            }
        }

        let drifted = rows.iter().filter(|r| r.len() != C::COLUMNS.len()).count();
        if drifted > 0 {
            warn!(
                "{}: {} of {} rows do not have the expected {} columns; missing columns read as NULL",
                table,
                drifted,
                rows.len(),
                C::COLUMNS.len()
            );
        }
        debug!("{}: parsed {} rows", table, rows.len());

        let rows = Arc::new(rows);
        self.parsed().insert(table, Arc::clone(&rows));
        rows
    }

    fn parsed(&self) -> MutexGuard<'_, HashMap<String, Arc<Vec<Row>>>> {
        self.parsed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Position in `listed` of each stock column of `C`, or `None` when the list
/// already is the stock order.
fn stock_order<C: Column>(table: &str, listed: &[String]) -> Option<Vec<Option<usize>>> {
    let in_stock_order = listed.len() == C::COLUMNS.len()
        && listed
            .iter()
            .zip(C::COLUMNS)
            .all(|(l, s)| l.eq_ignore_ascii_case(s));
    if in_stock_order {
        return None;
    }

    let order: Vec<Option<usize>> = C::COLUMNS
        .iter()
        .map(|name| listed.iter().position(|l| l.eq_ignore_ascii_case(name)))
        .collect();
    let missing: Vec<&str> = C::COLUMNS
        .iter()
        .zip(&order)
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| *name)
        .collect();
    warn!(
        "{}: INSERT lists columns in a non-stock order; values are mapped by name{}",
        table,
        if missing.is_empty() {
            String::new()
        } else {
            format!(" and {} read as NULL", missing.join(", "))
        }
    );
    Some(order)
}

/// One normalized tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Option<String>>,
}

impl Row {
    /// Tokenize and normalize a tuple body.
    pub fn parse(tuple: &str) -> Self {
        Self {
            values: tokenize::tokenize(tuple)
                .into_iter()
                .map(value::normalize)
                .collect(),
        }
    }

    /// Values rearranged so position `i` holds the value at `order[i]`.
    fn reorder(self, order: &[Option<usize>]) -> Self {
        Self {
            values: order
                .iter()
                .map(|pos| pos.and_then(|p| self.values.get(p).cloned().flatten()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a column; `None` for `NULL` and for columns past the end.
    pub fn get<C: Column>(&self, column: C) -> Option<&str> {
        self.values
            .get(column.index())
            .and_then(|v| v.as_deref())
    }

    /// Value of a column, with absent read as the empty string.
    pub fn text<C: Column>(&self, column: C) -> &str {
        self.get(column).unwrap_or_default()
    }

    /// Integer value of a column, if present and numeric.
    pub fn int<C: Column>(&self, column: C) -> Option<i64> {
        self.get(column).and_then(|v| v.trim().parse().ok())
    }
}
