//! Read-only summary of a dump.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dump::layout::{Column, PostColumn, RelationshipColumn, TaxonomyColumn, TermColumn};
use crate::dump::Dump;
use crate::error::Result;

/// Tuple counts and content breakdown of a dump.
#[derive(Debug, Clone, Serialize)]
pub struct DumpSummary {
    pub path: String,
    pub bytes: usize,
    /// Tuples per table, keyed by the prefixed table name.
    pub tables: BTreeMap<String, usize>,
    /// `post_type` -> `post_status` -> count.
    pub posts: BTreeMap<String, BTreeMap<String, usize>>,
    /// `taxonomy` -> count.
    pub taxonomies: BTreeMap<String, usize>,
}

impl DumpSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn table_name<C: Column>(prefix: &str) -> String {
    format!("{}{}", prefix, C::TABLE)
}

/// Parse the tables the migration reads and count what they hold.
pub fn inspect(dump: &Dump, prefix: &str) -> Result<DumpSummary> {
    let mut tables = BTreeMap::new();
    for table in [
        table_name::<TermColumn>(prefix),
        table_name::<TaxonomyColumn>(prefix),
        table_name::<PostColumn>(prefix),
        table_name::<RelationshipColumn>(prefix),
    ] {
        let count = dump.tuples(&table).len();
        tables.insert(table, count);
    }

    let mut posts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for row in dump.rows::<PostColumn>(prefix).iter() {
        *posts
            .entry(row.text(PostColumn::Type).to_string())
            .or_default()
            .entry(row.text(PostColumn::Status).to_string())
            .or_insert(0) += 1;
    }

    let mut taxonomies: BTreeMap<String, usize> = BTreeMap::new();
    for row in dump.rows::<TaxonomyColumn>(prefix).iter() {
        *taxonomies
            .entry(row.text(TaxonomyColumn::Taxonomy).to_string())
            .or_insert(0) += 1;
    }

    Ok(DumpSummary {
        path: dump.path().display().to_string(),
        bytes: dump.len(),
        tables,
        posts,
        taxonomies,
    })
}
