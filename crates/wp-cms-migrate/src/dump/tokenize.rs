//! Quote-aware splitting of tuple bodies into raw fields.
//!
//! [`ScanState`] is the single source of truth for "are we inside a string
//! literal". The statement extractor walks tuples with the same machine, so a
//! `)` or `,` inside quoted content can never end a tuple or a field.

/// Lexical state while scanning a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Outside any quoted string.
    Bare,
    /// Inside a string opened by the given quote character.
    InString(char),
    /// The previous character was a backslash. Holds the quote of the
    /// enclosing string, if any, to return to after the escaped character.
    Escaped(Option<char>),
}

impl ScanState {
    /// Advance the state machine by one character.
    pub fn step(self, c: char) -> ScanState {
        match self {
            ScanState::Escaped(None) => ScanState::Bare,
            ScanState::Escaped(Some(quote)) => ScanState::InString(quote),
            ScanState::Bare if c == '\\' => ScanState::Escaped(None),
            ScanState::InString(quote) if c == '\\' => ScanState::Escaped(Some(quote)),
            ScanState::Bare if c == '\'' || c == '"' => ScanState::InString(c),
            ScanState::InString(quote) if c == quote => ScanState::Bare,
            state => state,
        }
    }

    /// True when a delimiter at this point is structural.
    pub fn is_bare(self) -> bool {
        matches!(self, ScanState::Bare)
    }
}

/// Split the text between a tuple's outer parentheses on top-level commas.
///
/// Fields are trimmed and keep their quotes and backslashes; decoding is left
/// to [`super::value::normalize`]. A trailing empty segment is dropped.
pub fn tokenize(tuple: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut state = ScanState::Bare;
    let mut start = 0;

    for (i, c) in tuple.char_indices() {
        if c == ',' && state.is_bare() {
            fields.push(tuple[start..i].trim());
            start = i + 1;
            continue;
        }
        state = state.step(c);
    }

    let last = tuple[start..].trim();
    if !last.is_empty() {
        fields.push(last);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_level_commas(tuple: &str) -> usize {
        let mut state = ScanState::Bare;
        let mut commas = 0;
        for c in tuple.chars() {
            if c == ',' && state.is_bare() {
                commas += 1;
            }
            state = state.step(c);
        }
        commas
    }

    #[test]
    fn test_simple_tuple() {
        assert_eq!(tokenize("5,'News','news',0"), vec!["5", "'News'", "'news'", "0"]);
    }

    #[test]
    fn test_comma_inside_string_is_not_split() {
        let fields = tokenize("1,'Hello, world',NULL");
        assert_eq!(fields, vec!["1", "'Hello, world'", "NULL"]);
    }

    #[test]
    fn test_escaped_quote_keeps_string_open() {
        let fields = tokenize(r"7,'it\'s, fine','x'");
        assert_eq!(fields, vec!["7", r"'it\'s, fine'", "'x'"]);
    }

    #[test]
    fn test_other_quote_char_inside_string() {
        let fields = tokenize(r#"1,"say 'hi', then go",'a "b", c'"#);
        assert_eq!(
            fields,
            vec!["1", r#""say 'hi', then go""#, r#"'a "b", c'"#]
        );
    }

    #[test]
    fn test_escaped_backslash_before_closing_quote() {
        let fields = tokenize(r"'C:\\path\\',2");
        assert_eq!(fields, vec![r"'C:\\path\\'", "2"]);
    }

    #[test]
    fn test_parentheses_inside_string() {
        let fields = tokenize("3,'smile :) (really)',4");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "'smile :) (really)'");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(tokenize(" 1 ,  'a' ,\n2 "), vec!["1", "'a'", "2"]);
    }

    #[test]
    fn test_empty_middle_field_is_kept() {
        assert_eq!(tokenize("1,,2"), vec!["1", "", "2"]);
    }

    #[test]
    fn test_trailing_empty_segment_is_dropped() {
        assert_eq!(tokenize("1,'a',"), vec!["1", "'a'"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_field_count_matches_top_level_commas() {
        let samples = [
            "1,2,3",
            "1,'a,b,c',2",
            r"'x\'y,z',NULL,'',0",
            r#""q,\"r\"",'s'"#,
            "10,'(nested, (parens))','tail'",
        ];
        for sample in samples {
            assert_eq!(
                tokenize(sample).len(),
                top_level_commas(sample) + 1,
                "sample: {}",
                sample
            );
        }
    }

    #[test]
    fn test_retokenizing_joined_fields_is_stable() {
        let samples = [
            "5,'News','news',0",
            r"1,'it\'s, here','a\nb',NULL",
            r#"2, "x, y" ,'z'"#,
        ];
        for sample in samples {
            let first = tokenize(sample);
            let joined = first.join(",");
            assert_eq!(tokenize(&joined), first, "sample: {}", sample);
        }
    }
}
