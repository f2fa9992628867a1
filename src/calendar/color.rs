//! Цвет события выводится из категории и нигде не хранится.

use crate::models::Category;

pub const SHOOT_COLOR: &str = "#ff6347";
pub const MEETING_COLOR: &str = "#4682b4";
pub const OTHER_COLOR: &str = "#2e8b57";

/// Цвет для пустой или неизвестной категории.
pub const DEFAULT_COLOR: &str = OTHER_COLOR;

impl Category {
    pub fn color(&self) -> &'static str {
        match self {
            Category::Shoot => SHOOT_COLOR,
            Category::Meeting => MEETING_COLOR,
            Category::Other => OTHER_COLOR,
        }
    }
}

pub fn category_color(category: Option<&str>) -> &'static str {
    category
        .and_then(Category::parse)
        .map(|c| c.color())
        .unwrap_or(DEFAULT_COLOR)
}
