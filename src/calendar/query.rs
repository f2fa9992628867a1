use serde::Deserialize;

use crate::store::Filter;

/// Значение фильтра категорий, которое означает "без ограничения".
pub const ALL_CATEGORIES: &str = "all";

const SEARCH_COLUMNS: [&str; 2] = ["title", "description"];

/// Поиск и фильтр экрана календаря.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// (title ILIKE term OR description ILIKE term) AND category = filter
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            filter = filter.contains_any(&SEARCH_COLUMNS, term);
        }
        if let Some(category) = self
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
        {
            filter = filter.eq("category", category);
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Condition;

    #[test]
    fn all_and_empty_do_not_filter() {
        assert!(EventQuery::new().to_filter().is_empty());
        assert!(EventQuery::new().with_category("all").with_search("").to_filter().is_empty());
    }

    #[test]
    fn search_and_category_compose() {
        let filter = EventQuery::new()
            .with_search("shoot")
            .with_category("meeting")
            .to_filter();

        assert_eq!(filter.conditions().len(), 2);
        assert!(matches!(&filter.conditions()[0], Condition::AnyOf(alternatives) if alternatives.len() == 2));
        assert_eq!(
            filter.conditions()[1],
            Condition::Eq {
                column: "category".to_string(),
                value: "meeting".to_string()
            }
        );
    }
}
