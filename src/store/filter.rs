use serde_json::Value;

use crate::models::RowId;

/// Одно условие фильтра.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `column = value`
    Eq { column: String, value: String },
    /// `column ILIKE %term%`
    ILike { column: String, term: String },
    /// Хотя бы одно из вложенных условий.
    AnyOf(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Condition::Eq { column, value } => match row.get(column) {
                Some(Value::String(s)) => s == value,
                Some(Value::Number(n)) => n.to_string() == *value,
                Some(Value::Bool(b)) => b.to_string() == *value,
                _ => false,
            },
            Condition::ILike { column, term } => match row.get(column) {
                Some(Value::String(s)) => s.to_lowercase().contains(&term.to_lowercase()),
                _ => false,
            },
            Condition::AnyOf(conditions) => conditions.iter().any(|c| c.matches(row)),
        }
    }

    /// Параметр запроса PostgREST для условия верхнего уровня.
    fn query_pair(&self) -> (String, String) {
        match self {
            Condition::Eq { column, value } => (column.clone(), format!("eq.{}", value)),
            Condition::ILike { column, term } => (column.clone(), format!("ilike.*{}*", term)),
            Condition::AnyOf(conditions) => ("or".to_string(), logic_group(conditions)),
        }
    }

    /// Элемент логического дерева внутри `or=(...)`.
    fn logic_item(&self) -> String {
        match self {
            Condition::Eq { column, value } => format!("{}.eq.{}", column, quote(value)),
            Condition::ILike { column, term } => {
                format!("{}.ilike.{}", column, quote(&format!("*{}*", term)))
            }
            Condition::AnyOf(conditions) => format!("or{}", logic_group(conditions)),
        }
    }
}

fn logic_group(conditions: &[Condition]) -> String {
    let items: Vec<String> = conditions.iter().map(Condition::logic_item).collect();
    format!("({})", items.join(","))
}

// В логических деревьях PostgREST запятые и скобки - синтаксис, значения кавычим
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Конъюнкция условий над строками одной таблицы.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &RowId) -> Self {
        Self::new().eq("id", id.as_str())
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Подстрока без учёта регистра хотя бы в одной из колонок.
    /// Пустой поиск фильтр не сужает.
    pub fn contains_any(mut self, columns: &[&str], term: &str) -> Self {
        if term.is_empty() || columns.is_empty() {
            return self;
        }
        let alternatives = columns
            .iter()
            .map(|column| Condition::ILike {
                column: column.to_string(),
                term: term.to_string(),
            })
            .collect();
        self.conditions.push(Condition::AnyOf(alternatives));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Параметры запроса PostgREST. Несколько групп `or` сворачиваются в `and=(...)`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let (groups, plain): (Vec<&Condition>, Vec<&Condition>) = self
            .conditions
            .iter()
            .partition(|c| matches!(c, Condition::AnyOf(_)));

        let mut pairs: Vec<(String, String)> = plain.into_iter().map(Condition::query_pair).collect();
        match groups.as_slice() {
            [] => {}
            [single] => pairs.push(single.query_pair()),
            many => {
                let items: Vec<String> = many.iter().map(|c| c.logic_item()).collect();
                pairs.push(("and".to_string(), format!("({})", items.join(","))));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_filter() -> Filter {
        Filter::new()
            .contains_any(&["title", "description"], "shoot")
            .eq("category", "meeting")
    }

    #[test]
    fn renders_postgrest_params() {
        assert_eq!(
            search_filter().to_query_pairs(),
            vec![
                ("category".to_string(), "eq.meeting".to_string()),
                (
                    "or".to_string(),
                    r#"(title.ilike."*shoot*",description.ilike."*shoot*")"#.to_string()
                ),
            ]
        );
    }

    #[test]
    fn quotes_reserved_characters_inside_groups() {
        let filter = Filter::new().contains_any(&["title"], r#"a,b"(c)"#);
        assert_eq!(
            filter.to_query_pairs(),
            vec![("or".to_string(), r#"(title.ilike."*a,b\"(c)*")"#.to_string())]
        );
    }

    #[test]
    fn several_groups_are_joined_with_and() {
        let filter = Filter::new()
            .contains_any(&["title"], "a")
            .contains_any(&["location"], "b");
        assert_eq!(
            filter.to_query_pairs(),
            vec![(
                "and".to_string(),
                r#"(or(title.ilike."*a*"),or(location.ilike."*b*"))"#.to_string()
            )]
        );
    }

    #[test]
    fn empty_search_does_not_narrow() {
        assert!(Filter::new().contains_any(&["title"], "").is_empty());
        assert!(Filter::new().matches(&json!({"id": 1})));
    }

    #[test]
    fn search_and_category_intersect() {
        let filter = search_filter();

        // оба условия
        assert!(filter.matches(&json!({"title": "Client SHOOT sync", "category": "meeting"})));
        assert!(filter.matches(&json!({"title": "Sync", "description": "pre-shoot", "category": "meeting"})));
        // только поиск
        assert!(!filter.matches(&json!({"title": "Shoot A", "category": "shoot"})));
        // только категория
        assert!(!filter.matches(&json!({"title": "Budget", "description": null, "category": "meeting"})));
    }

    #[test]
    fn eq_compares_scalars_as_text() {
        let filter = Filter::new().eq("user_id", "5").eq("is_read", "false");
        assert!(filter.matches(&json!({"user_id": 5, "is_read": false})));
        assert!(!filter.matches(&json!({"user_id": 5, "is_read": true})));
        assert!(!filter.matches(&json!({"user_id": null, "is_read": false})));
    }
}
