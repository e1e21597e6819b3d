//! A deliberately minimal hand-rolled parser covering the subset of SELECT
//! syntax this system needs to recognize: qserv_areaspec_* calls, aggregate
//! functions, and the handful of clauses a chunked query actually uses.
//! Anything it can't make sense of is carried through as [`Conjunct::Raw`]
//! text rather than rejected, matching the non-goal of re-implementing the
//! SQL grammar - this parser's job is only to find the pieces the rewrite
//! plugins need, not to validate arbitrary SQL.

use crate::ast::{Conjunct, Expr, OrderItem, SelectItem, SelectStmt, TableRef};
use crate::error::{ParseSnafu, Result};
use snafu::ensure;

const CLAUSE_KEYWORDS: &[&str] = &["WHERE", "GROUP BY", "HAVING", "ORDER BY", "LIMIT"];

pub fn parse_select(sql: &str) -> Result<SelectStmt> {
    let sql = sql.trim().trim_end_matches(';').trim();
    let upper_start = sql.get(0..6).map(|s| s.to_ascii_uppercase());
    ensure!(
        upper_start.as_deref() == Some("SELECT"),
        ParseSnafu {
            message: "expected statement to start with SELECT".to_string(),
        }
    );
    let mut rest = sql[6..].trim_start();

    let mut distinct = false;
    if let Some(tail) = strip_keyword(rest, "DISTINCT") {
        distinct = true;
        rest = tail;
    }

    let (from_kw_start, from_kw_end) = find_keyword(rest, "FROM").ok_or_else(|| {
        ParseSnafu {
            message: "expected FROM clause".to_string(),
        }
        .build()
    })?;
    let select_list_str = rest[..from_kw_start].trim();
    rest = rest[from_kw_end..].trim_start();

    let (from_str, mut rest) = split_at_next_clause(rest);
    let from = parse_from(from_str.trim())?;

    let mut where_clause = Vec::new();
    if let Some(tail) = strip_keyword(rest, "WHERE") {
        let (where_str, tail2) = split_at_next_clause(tail.trim_start());
        where_clause = parse_where(where_str.trim())?;
        rest = tail2;
    }

    let mut group_by = Vec::new();
    if let Some(tail) = strip_keyword(rest, "GROUP BY") {
        let (group_str, tail2) = split_at_next_clause(tail.trim_start());
        group_by = split_top_level(group_str.trim(), ',')
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        rest = tail2;
    }

    let mut having = None;
    if let Some(tail) = strip_keyword(rest, "HAVING") {
        let (having_str, tail2) = split_at_next_clause(tail.trim_start());
        having = Some(having_str.trim().to_string());
        rest = tail2;
    }

    let mut order_by = Vec::new();
    if let Some(tail) = strip_keyword(rest, "ORDER BY") {
        let (order_str, tail2) = split_at_next_clause(tail.trim_start());
        order_by = parse_order_by(order_str.trim())?;
        rest = tail2;
    }

    let mut limit = None;
    if let Some(tail) = strip_keyword(rest, "LIMIT") {
        let n: u64 = tail.trim().parse().map_err(|_| {
            ParseSnafu {
                message: format!("invalid LIMIT value: {:?}", tail.trim()),
            }
            .build()
        })?;
        limit = Some(n);
        rest = "";
    }

    ensure!(
        rest.trim().is_empty(),
        ParseSnafu {
            message: format!("unexpected trailing text: {:?}", rest.trim()),
        }
    );

    let select_list = parse_select_list(select_list_str)?;

    Ok(SelectStmt {
        distinct,
        select_list,
        from,
        where_clause,
        group_by,
        having,
        order_by,
        limit,
    })
}

/// Strips a leading clause keyword (case-insensitive, matching whitespace
/// for multi-word keywords like `GROUP BY`) from `s`, returning the
/// remainder if it matched.
fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s_trim = s.trim_start();
    let mut parts = keyword.split(' ');
    let mut cursor = s_trim;
    for part in &mut parts {
        let word_len = part.len();
        if cursor.len() < word_len || !cursor[..word_len].eq_ignore_ascii_case(part) {
            return None;
        }
        cursor = &cursor[word_len..];
        if !is_word_boundary(cursor) {
            return None;
        }
        cursor = cursor.trim_start();
    }
    Some(cursor)
}

fn is_word_boundary(s: &str) -> bool {
    match s.chars().next() {
        None => true,
        Some(c) => !c.is_ascii_alphanumeric() && c != '_',
    }
}

/// Finds the first occurrence of `keyword` at paren depth 0, as a whole
/// word, returning its byte span.
fn find_keyword(s: &str, keyword: &str) -> Option<(usize, usize)> {
    find_any_keyword(s, &[keyword]).map(|(start, end, _)| (start, end))
}

/// Scans `s` left to right tracking paren depth and quoting, and returns the
/// byte span of the first occurrence of any of `keywords` found at depth 0
/// outside quotes, along with which keyword matched.
fn find_any_keyword<'a>(s: &str, keywords: &[&'a str]) -> Option<(usize, usize, &'a str)> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' => {
                in_quote = Some(c);
                i += 1;
                continue;
            }
            b'(' => {
                depth += 1;
                i += 1;
                continue;
            }
            b')' => {
                depth -= 1;
                i += 1;
                continue;
            }
            _ => {}
        }
        if depth == 0 && (i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_'))
        {
            for kw in keywords {
                if let Some(end) = match_keyword_at(s, i, kw) {
                    return Some((i, end, kw));
                }
            }
        }
        i += 1;
    }
    None
}

fn match_keyword_at(s: &str, pos: usize, keyword: &str) -> Option<usize> {
    let tail = s.get(pos..)?;
    strip_keyword(tail, keyword).map(|rest| s.len() - rest.len())
}

/// Splits `s` at the earliest of the standard trailing clause keywords,
/// returning `(before, from_keyword_onward)`.
fn split_at_next_clause(s: &str) -> (&str, &str) {
    match find_any_keyword(s, CLAUSE_KEYWORDS) {
        Some((start, _, _)) => (&s[..start], &s[start..]),
        None => (s, ""),
    }
}

/// Splits `s` on a top-level separator character, respecting paren depth
/// and quoting (e.g. commas inside a function call don't split).
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if c == sep && depth == 0 => {
                out.push(s[start..i].to_string());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(s[start..].to_string());
    out
}

/// Splits a WHERE clause into top-level conjuncts on `AND`, the same way
/// `split_top_level` splits on commas (the non-goal SQL grammar omits `OR`
/// and parenthesized boolean groups; they pass through as a single `Raw`
/// conjunct, which preserves correctness - just not sub-conjunct rewriting).
fn split_top_level_and(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut start = 0usize;
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                in_quote = Some(c);
                i += 1;
                continue;
            }
            '(' => {
                depth += 1;
                i += 1;
                continue;
            }
            ')' => {
                depth -= 1;
                i += 1;
                continue;
            }
            _ => {}
        }
        if depth == 0 && (i == 0 || !(bytes[i - 1] as char).is_ascii_alphanumeric()) {
            if let Some(end) = match_keyword_at(s, i, "AND") {
                out.push(s[start..i].to_string());
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out.push(s[start..].to_string());
    out
}

fn parse_select_list(s: &str) -> Result<Vec<SelectItem>> {
    let s = s.trim();
    if s == "*" {
        return Ok(Vec::new());
    }
    split_top_level(s, ',')
        .into_iter()
        .map(|item| parse_select_item(item.trim()))
        .collect()
}

fn parse_select_item(s: &str) -> Result<SelectItem> {
    // Recognize a trailing "AS alias" or bare "alias" (a single trailing
    // identifier with no parens/operators of its own).
    if let Some((expr_str, alias)) = split_trailing_alias(s) {
        Ok(SelectItem {
            expr: parse_expr(expr_str.trim())?,
            alias: Some(alias),
        })
    } else {
        Ok(SelectItem {
            expr: parse_expr(s)?,
            alias: None,
        })
    }
}

fn split_trailing_alias(s: &str) -> Option<(&str, String)> {
    let trimmed = s.trim_end();
    let upper = trimmed.to_ascii_uppercase();
    if let Some(pos) = upper.rfind(" AS ") {
        let alias = trimmed[pos + 4..].trim().to_string();
        return Some((&trimmed[..pos], alias));
    }
    None
}

fn parse_expr(s: &str) -> Result<Expr> {
    let s = s.trim();
    if s == "*" {
        return Ok(Expr::Star);
    }
    if let Some(open) = s.find('(') {
        if s.ends_with(')') {
            let name = s[..open].trim().to_string();
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                let inner = &s[open + 1..s.len() - 1];
                let args = if inner.trim() == "*" {
                    vec![Expr::Star]
                } else {
                    split_top_level(inner, ',')
                        .into_iter()
                        .map(|a| parse_expr(a.trim()))
                        .collect::<Result<Vec<_>>>()?
                };
                return Ok(Expr::Func { name, args });
            }
        }
    }
    if s.parse::<f64>().is_ok() || (s.starts_with('\'') && s.ends_with('\'')) {
        return Ok(Expr::Literal(s.to_string()));
    }
    Ok(Expr::Column(s.to_string()))
}

fn parse_from(s: &str) -> Result<Vec<TableRef>> {
    split_top_level(s, ',')
        .into_iter()
        .map(|item| parse_table_ref(item.trim()))
        .collect()
}

fn parse_table_ref(s: &str) -> Result<TableRef> {
    let (name_part, alias) = match split_trailing_alias(s) {
        Some((name, alias)) => (name.trim(), Some(alias)),
        None => {
            // `db.table alias` with no AS keyword: two space-separated words.
            let words: Vec<&str> = s.split_whitespace().collect();
            if words.len() == 2 {
                (words[0], Some(words[1].to_string()))
            } else {
                (s, None)
            }
        }
    };
    let (db, table) = match name_part.split_once('.') {
        Some((db, table)) => (Some(db.to_string()), table.to_string()),
        None => (None, name_part.to_string()),
    };
    ensure!(
        !table.is_empty(),
        ParseSnafu {
            message: "empty table reference".to_string(),
        }
    );
    Ok(TableRef { db, table, alias })
}

fn parse_where(s: &str) -> Result<Vec<Conjunct>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level_and(s)
        .into_iter()
        .map(|c| parse_conjunct(c.trim()))
        .collect()
}

fn parse_conjunct(s: &str) -> Result<Conjunct> {
    let upper = s.to_ascii_uppercase();
    for func in [
        "qserv_areaspec_box",
        "qserv_areaspec_circle",
        "qserv_areaspec_ellipse",
        "qserv_areaspec_poly",
    ] {
        let func_upper = func.to_ascii_uppercase();
        if upper.starts_with(&func_upper) && s.trim_end().ends_with(')') {
            let open = s.find('(').ok_or_else(|| {
                ParseSnafu {
                    message: format!("malformed {} call", func),
                }
                .build()
            })?;
            let inner = &s[open + 1..s.trim_end().len() - 1];
            let args = split_top_level(inner, ',')
                .into_iter()
                .map(|a| a.trim().to_string())
                .collect();
            return Ok(Conjunct::AreaSpec {
                func: func.to_string(),
                args,
            });
        }
    }
    Ok(Conjunct::Raw(s.to_string()))
}

fn parse_order_by(s: &str) -> Result<Vec<OrderItem>> {
    split_top_level(s, ',')
        .into_iter()
        .map(|item| {
            let item = item.trim();
            let upper = item.to_ascii_uppercase();
            let (expr_str, descending) = if let Some(stripped) = upper.strip_suffix(" DESC") {
                (&item[..stripped.len()], true)
            } else if let Some(stripped) = upper.strip_suffix(" ASC") {
                (&item[..stripped.len()], false)
            } else {
                (item, false)
            };
            Ok(OrderItem {
                expr: parse_expr(expr_str.trim())?,
                descending,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trivial_select() {
        let stmt = parse_select("SELECT * FROM Object WHERE someField > 5.0;").unwrap();
        assert!(stmt.select_list.is_empty());
        assert_eq!(stmt.from.len(), 1);
        assert_eq!(stmt.from[0].table, "Object");
        assert_eq!(stmt.where_clause.len(), 1);
        assert_eq!(stmt.where_clause[0], Conjunct::Raw("someField > 5.0".to_string()));
    }

    #[test]
    fn parses_aggregate_query_with_group_by_and_order_by() {
        let stmt = parse_select(
            "SELECT objectId, AVG(taiMidPoint) FROM Source GROUP BY objectId ORDER BY objectId ASC",
        )
        .unwrap();
        assert_eq!(stmt.select_list.len(), 2);
        assert!(stmt.select_list[1].expr.is_aggregate());
        assert_eq!(stmt.group_by, vec!["objectId".to_string()]);
        assert_eq!(stmt.order_by.len(), 1);
        assert!(!stmt.order_by[0].descending);
    }

    #[test]
    fn extracts_area_restrictor_conjunct() {
        let stmt =
            parse_select("SELECT * FROM Object WHERE qserv_areaspec_box(2,2,3,3)").unwrap();
        assert_eq!(
            stmt.where_clause[0],
            Conjunct::AreaSpec {
                func: "qserv_areaspec_box".to_string(),
                args: vec!["2".to_string(), "2".to_string(), "3".to_string(), "3".to_string()],
            }
        );
    }

    #[test]
    fn parses_secondary_index_predicate_as_raw() {
        let stmt =
            parse_select("SELECT * FROM Object WHERE objectIdObjTest IN (2,3145,9999)").unwrap();
        assert_eq!(
            stmt.where_clause[0],
            Conjunct::Raw("objectIdObjTest IN (2,3145,9999)".to_string())
        );
    }

    #[test]
    fn parses_multi_table_from_with_aliases() {
        let stmt = parse_select(
            "SELECT count(*) FROM Bad.Object AS o1, Object o2 WHERE o1.objectId = o2.objectId",
        )
        .unwrap();
        assert_eq!(stmt.from.len(), 2);
        assert_eq!(stmt.from[0].db.as_deref(), Some("Bad"));
        assert_eq!(stmt.from[0].alias.as_deref(), Some("o1"));
        assert_eq!(stmt.from[1].alias.as_deref(), Some("o2"));
    }

    #[test]
    fn parses_limit() {
        let stmt = parse_select("SELECT * FROM Object LIMIT 10").unwrap();
        assert_eq!(stmt.limit, Some(10));
    }
}
