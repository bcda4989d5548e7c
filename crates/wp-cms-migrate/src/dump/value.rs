//! Conversion of raw tuple fields into logical values.

/// Normalize one raw field.
///
/// - bare `NULL` is absent
/// - a field wrapped in matching `'` or `"` is unquoted and unescaped
/// - anything else (numbers, bare literals) is returned trimmed
pub fn normalize(field: &str) -> Option<String> {
    let field = field.trim();
    if field == "NULL" {
        return None;
    }

    match unquote(field) {
        Some(inner) => Some(unescape(inner)),
        None => Some(field.to_string()),
    }
}

fn unquote(field: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        (field.len() >= 2 && field.starts_with(quote) && field.ends_with(quote))
            .then(|| &field[1..field.len() - 1])
    })
}

/// Decode MySQL backslash escapes in a single left-to-right pass.
///
/// Unknown escapes are kept verbatim, backslash included.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_null_is_absent() {
        assert_eq!(normalize("NULL"), None);
        assert_eq!(normalize("  NULL "), None);
    }

    #[test]
    fn test_null_is_case_sensitive_and_unquoted() {
        assert_eq!(normalize("null").as_deref(), Some("null"));
        assert_eq!(normalize("'NULL'").as_deref(), Some("NULL"));
    }

    #[test]
    fn test_escaped_single_quote() {
        assert_eq!(normalize(r"'it\'s'").as_deref(), Some("it's"));
    }

    #[test]
    fn test_newline_escape() {
        assert_eq!(normalize(r"'a\nb'").as_deref(), Some("a\nb"));
        assert_eq!(normalize(r"'a\nb'").unwrap().lines().count(), 2);
    }

    #[test]
    fn test_bare_numeral_unchanged() {
        assert_eq!(normalize("42").as_deref(), Some("42"));
        assert_eq!(normalize(" -3.5 ").as_deref(), Some("-3.5"));
    }

    #[test]
    fn test_double_quoted_string() {
        assert_eq!(normalize(r#""say \"hi\"""#).as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn test_escaped_backslash_is_not_reinterpreted() {
        // `\\n` is a literal backslash followed by `n`, not a newline
        assert_eq!(normalize(r"'C:\\new'").as_deref(), Some(r"C:\new"));
    }

    #[test]
    fn test_tab_and_carriage_return() {
        assert_eq!(normalize(r"'a\tb\r\n'").as_deref(), Some("a\tb\r\n"));
    }

    #[test]
    fn test_unknown_escape_is_kept() {
        assert_eq!(unescape(r"x\0y\%"), r"x\0y\%");
    }

    #[test]
    fn test_empty_string_literal() {
        assert_eq!(normalize("''").as_deref(), Some(""));
    }

    #[test]
    fn test_lone_quote_is_bare() {
        assert_eq!(normalize("'").as_deref(), Some("'"));
    }
}
