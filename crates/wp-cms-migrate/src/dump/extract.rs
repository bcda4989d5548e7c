//! Locating `INSERT ... VALUES` statements in a dump.
//!
//! The dump is split into statements on `;` outside string literals and
//! comments, so a statement can start anywhere on a line and header text
//! quoted inside another statement is never mistaken for a real one.

use std::ops::Range;

use super::tokenize::ScanState;
use crate::error::{MigrateError, Result};
use regex::Regex;
use tracing::warn;

/// `INSERT [IGNORE] INTO `table` [(cols)] VALUES` at the start of a statement.
const INSERT_HEADER: &str = r"\A(?i:insert)\s+(?:(?i:ignore)\s+)?(?i:into)\s+`?([^`\s(]+)`?\s*(?:\(([^)]*)\)\s*)?(?i:values)\s*";

/// One `INSERT` statement, with tuples as byte ranges into the dump text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    /// Explicit column list, unquoted, when the statement names one.
    pub columns: Option<Vec<String>>,
    /// Text between each tuple's outer parentheses.
    pub tuples: Vec<Range<usize>>,
}

/// Recognizes `INSERT` statements and slices their tuples.
pub struct InsertParser {
    header: Regex,
}

impl InsertParser {
    pub fn new() -> Result<Self> {
        let header = Regex::new(INSERT_HEADER).map_err(|e| {
            MigrateError::Config(format!("Cannot match INSERT statements: {}", e))
        })?;
        Ok(Self { header })
    }

    /// Parse every `INSERT` statement of `sql`, in dump order.
    pub fn inserts(&self, sql: &str) -> Vec<Insert> {
        statements(sql)
            .into_iter()
            .filter_map(|span| self.parse(sql, span))
            .collect()
    }

    /// Parse the statement at `span`, or `None` if it is not an `INSERT`.
    fn parse(&self, sql: &str, span: Range<usize>) -> Option<Insert> {
        let statement = &sql[span.clone()];
        let caps = self.header.captures(statement)?;
        let table = caps.get(1)?.as_str().to_string();
        let columns = caps.get(2).map(|cols| {
            cols.as_str()
                .split(',')
                .map(|c| c.trim().trim_matches('`').to_string())
                .collect()
        });
        let values_at = span.start + caps.get(0)?.end();

        let mut tuples = Vec::new();
        scan_values(sql, values_at..span.end, &table, &mut tuples);
        Some(Insert {
            table,
            columns,
            tuples,
        })
    }
}

/// Return the body of every tuple inserted into `table`, in dump order.
///
/// No matching statement yields an empty vector.
pub fn extract_tuples<'a>(sql: &'a str, table: &str) -> Result<Vec<&'a str>> {
    let parser = InsertParser::new()?;
    Ok(parser
        .inserts(sql)
        .into_iter()
        .filter(|insert| insert.table == table)
        .flat_map(|insert| insert.tuples)
        .map(|range| &sql[range])
        .collect())
}

/// Split `sql` into statement spans.
///
/// A span starts at the statement's first token, after whitespace and
/// comments, and stops before the terminating `;`. A final statement without
/// `;` is kept. `--` line comments and `/* */` blocks (including mysqldump's
/// `/*! ... */` directives) outside strings never start a statement.
pub fn statements(sql: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut state = ScanState::Bare;
    let mut start: Option<usize> = None;
    let mut resume_at = 0;

    for (i, c) in sql.char_indices() {
        if i < resume_at {
            continue;
        }
        if state.is_bare() {
            let rest = &sql[i..];
            if rest.starts_with("/*") {
                resume_at = rest.find("*/").map_or(sql.len(), |end| i + end + 2);
                continue;
            }
            if is_line_comment(rest) {
                resume_at = rest.find('\n').map_or(sql.len(), |end| i + end + 1);
                continue;
            }
            if c == ';' {
                if let Some(s) = start.take() {
                    spans.push(s..i);
                }
                continue;
            }
            if start.is_none() && !c.is_whitespace() {
                start = Some(i);
            }
        }
        state = state.step(c);
    }

    if let Some(s) = start {
        spans.push(s..sql.len());
    }
    spans
}

/// MySQL only treats `--` as a comment when whitespace or the end follows.
fn is_line_comment(rest: &str) -> bool {
    rest.starts_with("--") && rest[2..].chars().next().map_or(true, char::is_whitespace)
}

/// Scan a `VALUES` list, pushing tuple body ranges.
fn scan_values(sql: &str, span: Range<usize>, table: &str, out: &mut Vec<Range<usize>>) {
    let body = &sql[span.clone()];
    let mut state = ScanState::Bare;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        if depth == 0 {
            match c {
                '(' => {
                    depth = 1;
                    start = i + 1;
                    state = ScanState::Bare;
                }
                ',' => {}
                c if c.is_whitespace() => {}
                other => {
                    warn!(
                        table,
                        "Unexpected {:?} between tuples at byte {}; skipping rest of statement",
                        other,
                        span.start + i
                    );
                    return;
                }
            }
            continue;
        }

        let structural = state.is_bare();
        state = state.step(c);
        if !structural {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    out.push(span.start + start..span.start + i);
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        warn!(table, "INSERT statement ends inside a tuple (truncated dump?)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement() {
        let sql = "INSERT INTO `wp_terms` VALUES (1,'A','a',0),(2,'B','b',0);\n";
        assert_eq!(
            extract_tuples(sql, "wp_terms").unwrap(),
            vec!["1,'A','a',0", "2,'B','b',0"]
        );
    }

    #[test]
    fn test_multiple_statements_and_other_tables() {
        let sql = "\
INSERT INTO `wp_terms` VALUES (1,'A','a',0);
INSERT INTO `wp_options` VALUES (1,'x','y','yes');
INSERT INTO `wp_terms` VALUES (2,'B','b',0);
";
        assert_eq!(
            extract_tuples(sql, "wp_terms").unwrap(),
            vec!["1,'A','a',0", "2,'B','b',0"]
        );
        assert_eq!(extract_tuples(sql, "wp_options").unwrap().len(), 1);
    }

    #[test]
    fn test_statements_on_one_line() {
        let sql = "INSERT INTO `wp_terms` VALUES (1,'A','a',0);INSERT INTO `wp_terms` VALUES (2,'B','b',0);\n";
        assert_eq!(
            extract_tuples(sql, "wp_terms").unwrap(),
            vec!["1,'A','a',0", "2,'B','b',0"]
        );
    }

    #[test]
    fn test_insert_after_lock_tables_on_same_line() {
        let sql = "LOCK TABLES `wp_terms` WRITE; INSERT INTO `wp_terms` VALUES (1,'A','a',0); UNLOCK TABLES;";
        assert_eq!(extract_tuples(sql, "wp_terms").unwrap(), vec!["1,'A','a',0"]);
    }

    #[test]
    fn test_mysqldump_comments_and_directives() {
        let sql = "\
-- MySQL dump 10.13
--
-- Dumping data for table `wp_terms`, it's here
--
/*!40000 ALTER TABLE `wp_terms` DISABLE KEYS */;
INSERT INTO `wp_terms` VALUES (1,'A','a',0);
/*!40000 ALTER TABLE `wp_terms` ENABLE KEYS */;
";
        assert_eq!(extract_tuples(sql, "wp_terms").unwrap(), vec!["1,'A','a',0"]);
    }

    #[test]
    fn test_statement_spans() {
        let sql = "SET x=1; -- note\nINSERT INTO t VALUES ('a;b');\n/* c; */ SELECT 1";
        let spans: Vec<&str> = statements(sql).into_iter().map(|r| &sql[r]).collect();
        assert_eq!(spans, vec!["SET x=1", "INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }

    #[test]
    fn test_multiline_statement_with_whitespace() {
        let sql = "insert into wp_terms values\n  (1,'A','a',0),\n  (2,'B','b',0)\n;";
        assert_eq!(extract_tuples(sql, "wp_terms").unwrap().len(), 2);
    }

    #[test]
    fn test_no_match_is_empty() {
        let sql = "CREATE TABLE `wp_terms` (id int);";
        assert!(extract_tuples(sql, "wp_terms").unwrap().is_empty());
        assert!(extract_tuples("", "wp_posts").unwrap().is_empty());
    }

    #[test]
    fn test_parens_and_semicolons_inside_strings() {
        let sql = r"INSERT INTO `wp_posts` VALUES (1,'a) b; (c','x'),(2,'it\'s )','y');";
        let tuples = extract_tuples(sql, "wp_posts").unwrap();
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0], "1,'a) b; (c','x'");
        assert_eq!(tuples[1], r"2,'it\'s )','y'");
    }

    #[test]
    fn test_table_name_is_exact() {
        let sql = "INSERT INTO `wp_postmeta` VALUES (1,1,'k','v');\nINSERT INTO `wp_posts_old` VALUES (9);";
        assert!(extract_tuples(sql, "wp_posts").unwrap().is_empty());
    }

    #[test]
    fn test_header_inside_string_is_ignored() {
        let sql = r"INSERT INTO `wp_posts` VALUES (1,'Try: INSERT INTO `wp_terms` VALUES (9,\'X\',\'x\',0);');";
        assert!(extract_tuples(sql, "wp_terms").unwrap().is_empty());
        assert_eq!(extract_tuples(sql, "wp_posts").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_ignore_and_column_list() {
        let sql = "INSERT IGNORE INTO `wp_terms` (`term_id`, `name`,`slug`,`term_group`) VALUES (3,'C','c',0);";
        assert_eq!(extract_tuples(sql, "wp_terms").unwrap(), vec!["3,'C','c',0"]);

        let inserts = InsertParser::new().unwrap().inserts(sql);
        assert_eq!(
            inserts[0].columns.as_deref(),
            Some(&["term_id", "name", "slug", "term_group"].map(String::from)[..])
        );
    }

    #[test]
    fn test_truncated_statement_keeps_complete_tuples() {
        let sql = "INSERT INTO `wp_terms` VALUES (1,'A','a',0),(2,'B";
        assert_eq!(extract_tuples(sql, "wp_terms").unwrap(), vec!["1,'A','a',0"]);
    }
}
