//! List-field parsing and value normalization.
//!
//! Input tables carry keywords, categories and references either as delimited
//! strings (`"a; b; c"`) or as list literals (`"['a', 'b']"`, `["a","b"]`).
//! [`parse_list_field`] returns a tagged [`ListField`] so callers can tell
//! "no data" apart from "could not parse" when tallying diagnostics.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Outcome of parsing one list-valued cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListField {
    /// At least one usable value
    Values(Vec<String>),
    /// Cell was blank, `nan`, `[]`, or held only blank items
    Empty,
    /// Cell looked like a list literal but could not be parsed
    Malformed,
}

impl ListField {
    /// Values, with both `Empty` and `Malformed` collapsing to an empty list
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ListField::Values(values) => values,
            ListField::Empty | ListField::Malformed => Vec::new(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ListField::Malformed)
    }
}

/// Which column a cell came from; selects delimiters and normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Keywords,
    Categories,
    References,
}

impl FieldKind {
    /// Delimiters in priority order. The first one present in a cell wins.
    fn delimiters(self) -> &'static [char] {
        match self {
            FieldKind::Keywords => &[';', ',', '|', '、'],
            FieldKind::Categories => &[';', '|', '/'],
            FieldKind::References => &[';', ',', '|'],
        }
    }

    fn normalize(self, item: &str) -> String {
        match self {
            FieldKind::Keywords => normalize_keyword(item),
            FieldKind::Categories => item.trim().to_string(),
            FieldKind::References => normalize_identifier(item),
        }
    }
}

/// Parse a list-valued cell.
pub fn parse_list_field(raw: &str, kind: FieldKind) -> ListField {
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return ListField::Empty;
    }

    let items = if trimmed.starts_with('[') {
        if !trimmed.ends_with(']') {
            return ListField::Malformed;
        }
        match parse_list_literal(trimmed) {
            Some(items) => items,
            None => return ListField::Malformed,
        }
    } else {
        split_delimited(trimmed, kind)
    };

    let mut seen = HashSet::new();
    let values: Vec<String> = items
        .iter()
        .filter(|item| !is_null_token(item.trim()))
        .map(|item| kind.normalize(item))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.clone()))
        .collect();

    if values.is_empty() {
        ListField::Empty
    } else {
        ListField::Values(values)
    }
}

fn is_null_token(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("null")
}

fn split_delimited(s: &str, kind: FieldKind) -> Vec<String> {
    if let Some(delim) = kind.delimiters().iter().find(|d| s.contains(**d)) {
        return s.split(*delim).map(|p| p.trim().to_string()).collect();
    }
    if kind == FieldKind::References {
        return s.split_whitespace().map(str::to_string).collect();
    }
    vec![s.to_string()]
}

/// Parse `[...]` as a JSON array first, then as a Python-style list literal.
fn parse_list_literal(s: &str) -> Option<Vec<String>> {
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(s) {
        return Some(
            values
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        );
    }

    let inner = &s[1..s.len() - 1];
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek().copied() {
            None => break,
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut item = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next()? {
                            'n' => item.push('\n'),
                            't' => item.push('\t'),
                            other => item.push(other),
                        },
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        c => item.push(c),
                    }
                }
                if !closed {
                    return None;
                }
                items.push(item);
            }
            Some(_) => {
                let mut item = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    if matches!(c, '[' | ']' | '\'' | '"') {
                        return None;
                    }
                    item.push(c);
                    chars.next();
                }
                items.push(item.trim().to_string());
            }
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }

    Some(items)
}

/// Case-fold and trim a keyword.
pub fn normalize_keyword(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn doi_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)")
            .unwrap_or_else(|_| Regex::new(r"^$").expect("Empty regex"))
    })
}

/// Normalize a paper identifier: trim, strip DOI URL/`doi:` prefixes, lower-case.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    doi_prefix().replace(trimmed, "").trim().to_lowercase()
}

fn embedded_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)")
            .unwrap_or_else(|_| Regex::new(r"^$").expect("Empty regex"))
    })
}

/// Accept only years in `1000..=2999`
pub fn plausible_year(year: i64) -> Option<i32> {
    (1000..=2999).contains(&year).then_some(year as i32)
}

/// Parse a publication year from `2019`, `2019.0`, or a date string like `2019-06-01`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return None;
    }
    if let Ok(year) = trimmed.parse::<i64>() {
        return plausible_year(year);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() && value.fract() == 0.0 {
            return plausible_year(value as i64);
        }
        return None;
    }
    embedded_year()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .and_then(plausible_year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(field: ListField) -> Vec<String> {
        field.into_vec()
    }

    #[test]
    fn test_empty_cells() {
        assert_eq!(parse_list_field("", FieldKind::Keywords), ListField::Empty);
        assert_eq!(parse_list_field("  nan ", FieldKind::Keywords), ListField::Empty);
        assert_eq!(parse_list_field("[]", FieldKind::References), ListField::Empty);
        assert_eq!(parse_list_field("['', ' ']", FieldKind::Categories), ListField::Empty);
    }

    #[test]
    fn test_python_list_literal() {
        let parsed = parse_list_field("['10.1/A', \"10.1/b\", 'doi:10.1/C']", FieldKind::References);
        assert_eq!(values(parsed), vec!["10.1/a", "10.1/b", "10.1/c"]);
    }

    #[test]
    fn test_json_list_literal() {
        let parsed = parse_list_field(r#"["NLP", "Transformer", "nlp"]"#, FieldKind::Keywords);
        assert_eq!(values(parsed), vec!["nlp", "transformer"]);
    }

    #[test]
    fn test_malformed_literal() {
        assert!(parse_list_field("['a', 'b'", FieldKind::References).is_malformed());
        assert!(parse_list_field("['a, 'b']", FieldKind::References).is_malformed());
        assert!(parse_list_field("['a' 'b']", FieldKind::Keywords).is_malformed());
    }

    #[test]
    fn test_bare_list_literal() {
        let parsed = parse_list_field("[a, b , c]", FieldKind::Keywords);
        assert_eq!(values(parsed), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_delimiter_priority() {
        let parsed = parse_list_field("Deep Learning; NLP, Transformers", FieldKind::Keywords);
        assert_eq!(values(parsed), vec!["deep learning", "nlp, transformers"]);

        let parsed = parse_list_field("深度学习、自然语言处理", FieldKind::Keywords);
        assert_eq!(values(parsed), vec!["深度学习", "自然语言处理"]);

        let parsed = parse_list_field("Physics | Chemistry", FieldKind::Categories);
        assert_eq!(values(parsed), vec!["Physics", "Chemistry"]);
    }

    #[test]
    fn test_reference_whitespace_split() {
        let parsed = parse_list_field("10.1/a 10.1/b", FieldKind::References);
        assert_eq!(values(parsed), vec!["10.1/a", "10.1/b"]);
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier(" https://doi.org/10.1000/ABC "), "10.1000/abc");
        assert_eq!(normalize_identifier("http://dx.doi.org/10.1/x"), "10.1/x");
        assert_eq!(normalize_identifier("DOI: 10.1/Y"), "10.1/y");
        assert_eq!(normalize_identifier("W12345"), "w12345");
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year("2019.0"), Some(2019));
        assert_eq!(parse_year("2019-06-01"), Some(2019));
        assert_eq!(parse_year("Jun 2020"), Some(2020));
        assert_eq!(parse_year("2019.5"), None);
        assert_eq!(parse_year("nan"), None);
        assert_eq!(parse_year("unknown"), None);
        assert_eq!(parse_year("12"), None);
    }
}
