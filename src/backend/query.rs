//! Row-level query description shared by every backend.
//!
//! A [`TableQuery`] renders to PostgREST query parameters for the hosted
//! table API and can also be evaluated directly against JSON rows, which is
//! how the in-memory backend answers the same queries.

use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    IsNull(String),
    In(String, Vec<String>),
    /// Case-insensitive pattern where `*` matches any run of characters.
    ILike(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push(Filter::Neq(column.to_string(), value.to_string()));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.into()));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction: SortDirection::Asc,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            direction: SortDirection::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the query as PostgREST parameters (`col=eq.value`, `order=a.asc`, ...).
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::Eq(col, v) => (col.clone(), format!("eq.{v}")),
                Filter::Neq(col, v) => (col.clone(), format!("neq.{v}")),
                Filter::IsNull(col) => (col.clone(), "is.null".to_string()),
                Filter::In(col, values) => {
                    let joined = values
                        .iter()
                        .map(|v| quote_list_value(v))
                        .collect::<Vec<_>>()
                        .join(",");
                    (col.clone(), format!("in.({joined})"))
                }
                Filter::ILike(col, pattern) => (col.clone(), format!("ilike.{pattern}")),
            })
            .collect();

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| match o.direction {
                    SortDirection::Asc => format!("{}.asc", o.column),
                    SortDirection::Desc => format!("{}.desc", o.column),
                })
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    /// True when `row` satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(col, v) => column_text(row, col).as_deref() == Some(v.as_str()),
            Filter::Neq(col, v) => column_text(row, col).as_deref() != Some(v.as_str()),
            Filter::IsNull(col) => row.get(col).map_or(true, Value::is_null),
            Filter::In(col, values) => column_text(row, col)
                .map(|text| values.iter().any(|v| *v == text))
                .unwrap_or(false),
            Filter::ILike(col, pattern) => column_text(row, col)
                .map(|text| glob_match_ci(pattern, &text))
                .unwrap_or(false),
        })
    }

    /// Filters, orders, offsets and limits a set of rows.
    pub fn apply(&self, rows: &[Value]) -> Vec<Value> {
        let mut selected: Vec<Value> = rows.iter().filter(|r| self.matches(r)).cloned().collect();

        if !self.order.is_empty() {
            selected.sort_by(|a, b| {
                for o in &self.order {
                    let ord = compare_json(
                        a.get(&o.column).unwrap_or(&Value::Null),
                        b.get(&o.column).unwrap_or(&Value::Null),
                    );
                    let ord = match o.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = self.offset.unwrap_or(0);
        let iter = selected.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Text form of a column, the way the table API compares filter values.
fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn quote_list_value(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Nulls sort after everything else in ascending order, matching PostgreSQL.
fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.total_cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn glob_match_ci(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while t < text.len() {
        if p < pattern.len() && pattern[p] != '*' && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": "a", "locale": "en", "position": 2, "parent_id": null, "title": "Blue Shirt"}),
            json!({"id": "b", "locale": "ar", "position": 1, "parent_id": "a", "title": "قميص"}),
            json!({"id": "c", "locale": "en", "position": 1, "title": "Red Shirt"}),
            json!({"id": "d", "locale": "en", "position": null, "title": "Hat"}),
        ]
    }

    #[test]
    fn renders_postgrest_parameters() {
        let q = TableQuery::new()
            .eq("locale", "en")
            .is_null("parent_id")
            .in_list("id", ["a", "b c"])
            .ilike("title", "*shirt*")
            .order_asc("position")
            .order_desc("created_at")
            .limit(5)
            .offset(10);

        assert_eq!(
            q.to_query_pairs(),
            vec![
                ("locale".into(), "eq.en".into()),
                ("parent_id".into(), "is.null".into()),
                ("id".into(), "in.(a,\"b c\")".into()),
                ("title".into(), "ilike.*shirt*".into()),
                ("order".into(), "position.asc,created_at.desc".into()),
                ("limit".into(), "5".into()),
                ("offset".into(), "10".into()),
            ]
        );
    }

    #[test]
    fn evaluates_filters_against_rows() {
        let q = TableQuery::new().eq("locale", "en").is_null("parent_id");
        let ids: Vec<_> = q.apply(&rows()).iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("c"), json!("d")]);

        let q = TableQuery::new().ilike("title", "*SHIRT");
        assert_eq!(q.apply(&rows()).len(), 2);

        let q = TableQuery::new().in_list("id", ["b", "d"]).neq("id", "d");
        assert_eq!(q.apply(&rows())[0]["id"], "b");
    }

    #[test]
    fn orders_with_nulls_last_and_paginates() {
        let q = TableQuery::new().order_asc("position").order_asc("id");
        let ids: Vec<_> = q.apply(&rows()).iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("b"), json!("c"), json!("a"), json!("d")]);

        let q = TableQuery::new().order_asc("position").order_asc("id").offset(1).limit(2);
        let ids: Vec<_> = q.apply(&rows()).iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("c"), json!("a")]);
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match_ci("*ab*", "xxABxx"));
        assert!(glob_match_ci("a*c", "abbbc"));
        assert!(!glob_match_ci("a*c", "abbbd"));
        assert!(glob_match_ci("*", ""));
    }
}
