//! Row selection in PostgREST terms.

use std::cmp::Ordering;

use serde_json::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// A `select=*` query with equality filters, one ordering and a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    filters: Vec<(String, String)>,
    order: Option<(String, Direction)>,
    limit: Option<usize>,
}

impl Select {
    /// Every row, unordered.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Order by `column`.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// PostgREST query string pairs.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(
            self.filters
                .iter()
                .map(|(column, value)| (column.clone(), format!("eq.{value}"))),
        );
        if let Some((column, direction)) = &self.order {
            pairs.push(("order".to_string(), format!("{column}.{}", direction.as_str())));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Whether a row passes every filter.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column).and_then(value_text).as_deref() == Some(value))
    }

    /// Evaluate the query locally over `rows`.
    #[must_use]
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if let Some((column, direction)) = &self.order {
            selected.sort_by(|a, b| {
                let ordering = compare(a.get(column), b.get(column));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Text form of a scalar JSON value, as PostgREST compares it.
#[must_use]
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// Nulls sort last ascending, as in Postgres.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_query_pairs() {
        let query = Select::all()
            .eq("status", "available")
            .order("created_at", Direction::Descending)
            .limit(1);
        assert_eq!(
            query.query_pairs(),
            vec![
                pair("select", "*"),
                pair("status", "eq.available"),
                pair("order", "created_at.desc"),
                pair("limit", "1"),
            ]
        );
        assert_eq!(Select::all().query_pairs(), vec![pair("select", "*")]);
    }

    #[test]
    fn test_matches_compares_text_forms() {
        let row = json!({"id": 7, "status": "available"});
        assert!(Select::all().eq("id", 7).matches(&row));
        assert!(Select::all().eq("id", "7").eq("status", "available").matches(&row));
        assert!(!Select::all().eq("status", "sold").matches(&row));
        assert!(!Select::all().eq("missing", "x").matches(&row));
    }

    #[test]
    fn test_apply_filters_orders_and_limits() {
        let rows = vec![
            json!({"id": 1, "created_at": "2025-01-01T00:00:00.000001Z", "status": "available"}),
            json!({"id": 2, "created_at": "2025-01-01T00:00:00.000003Z", "status": "sold"}),
            json!({"id": 3, "created_at": "2025-01-01T00:00:00.000002Z", "status": "available"}),
            json!({"id": 4, "status": "available"}),
        ];

        let newest = Select::all()
            .eq("status", "available")
            .order("created_at", Direction::Descending)
            .apply(rows.clone());
        let ids: Vec<_> = newest.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(4), json!(3), json!(1)]);

        let by_id = Select::all()
            .order("id", Direction::Ascending)
            .limit(2)
            .apply(rows);
        let ids: Vec<_> = by_id.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }
}
