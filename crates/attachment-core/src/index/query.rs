//! FTS5 query building utilities.

/// Quote a term for an FTS5 query.
///
/// Every term becomes a string literal, so user text can never be read as
/// an FTS5 operator (`AND`, `NEAR`, `col:`, parentheses, `-`).
pub fn escape_fts5_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Build an FTS5 match expression from free text.
///
/// Terms are ANDed together and prefix matched:
/// - "cat" → `"cat"*`
/// - "annual report" → `"annual"* "report"*`
/// - "gpt-2" → `"gpt-2"*`
///
/// Terms without any alphanumeric character are dropped since they cannot
/// produce a token. Returns an empty string when nothing is left.
pub fn build_match_expression(search_term: &str) -> String {
    build_terms(search_term, None)
}

/// Like [`build_match_expression`], with every phrase restricted to one
/// column: "cat dog" → `text : "cat"* text : "dog"*`.
pub fn build_column_match(column: &str, search_term: &str) -> String {
    build_terms(search_term, Some(column))
}

fn build_terms(search_term: &str, column: Option<&str>) -> String {
    search_term
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| match column {
            Some(column) => format!("{} : {}*", column, escape_fts5_term(term)),
            None => format!("{}*", escape_fts5_term(term)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_simple_term() {
        assert_eq!(escape_fts5_term("invoice"), "\"invoice\"");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_fts5_term("test\"quote"), "\"test\"\"quote\"");
    }

    #[test]
    fn test_build_single_term() {
        assert_eq!(build_match_expression("cat"), "\"cat\"*");
        assert_eq!(build_match_expression("gpt-2"), "\"gpt-2\"*");
    }

    #[test]
    fn test_build_multiple_terms() {
        assert_eq!(
            build_match_expression("annual  report"),
            "\"annual\"* \"report\"*"
        );
    }

    #[test]
    fn test_operators_are_neutralized() {
        assert_eq!(
            build_match_expression("cats OR dogs"),
            "\"cats\"* \"OR\"* \"dogs\"*"
        );
        assert_eq!(build_match_expression("title:x"), "\"title:x\"*");
    }

    #[test]
    fn test_build_column_match() {
        assert_eq!(
            build_column_match("text", "cat dog"),
            "text : \"cat\"* text : \"dog\"*"
        );
        assert_eq!(build_column_match("text", "  "), "");
    }

    #[test]
    fn test_build_empty() {
        assert_eq!(build_match_expression(""), "");
        assert_eq!(build_match_expression("   "), "");
        assert_eq!(build_match_expression(" - ( ) "), "");
    }
}
