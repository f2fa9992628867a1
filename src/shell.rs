//! Каркас приложения: режим раскладки, боковая навигация и таблица разделов.

use serde::Serialize;

pub const HOME_PREFIX: &str = "/home/";

const TABLET_MIN_WIDTH: u32 = 768;
const DESKTOP_MIN_WIDTH: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Навигация открывается поверх контента кнопкой-гамбургером.
    Mobile,
    /// Сворачивается и разворачивается по клику.
    Tablet,
    /// Разворачивается при наведении.
    Desktop,
}

impl LayoutMode {
    pub fn for_width(width: u32) -> Self {
        if width < TABLET_MIN_WIDTH {
            LayoutMode::Mobile
        } else if width < DESKTOP_MIN_WIDTH {
            LayoutMode::Tablet
        } else {
            LayoutMode::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavState {
    pub layout: LayoutMode,
    pub collapsed: bool,
    pub overlay_open: bool,
}

impl NavState {
    pub fn new(width: u32) -> Self {
        Self {
            layout: LayoutMode::for_width(width),
            collapsed: true,
            overlay_open: false,
        }
    }

    pub fn resize(&mut self, width: u32) {
        self.layout = LayoutMode::for_width(width);
    }

    pub fn sidebar_click(&mut self) {
        if self.layout == LayoutMode::Tablet {
            self.collapsed = !self.collapsed;
        }
    }

    pub fn hover(&mut self, inside: bool) {
        if self.layout == LayoutMode::Desktop {
            self.collapsed = !inside;
        }
    }

    pub fn hamburger_click(&mut self) {
        self.overlay_open = !self.overlay_open;
    }

    pub fn item_selected(&mut self) {
        if self.layout == LayoutMode::Mobile {
            self.overlay_open = false;
        }
    }

    pub fn outside_touch(&mut self) {
        if self.layout == LayoutMode::Mobile && self.overlay_open {
            self.overlay_open = false;
        }
    }

    /// На мобильном боковая панель видна только при открытом оверлее.
    pub fn sidebar_visible(&self) -> bool {
        self.layout != LayoutMode::Mobile || self.overlay_open
    }

    pub fn labels_visible(&self) -> bool {
        !self.collapsed && self.layout != LayoutMode::Mobile
    }

    pub fn sidebar_width(&self) -> u32 {
        match (self.collapsed, self.layout) {
            (true, _) => 80,
            (false, LayoutMode::Mobile) => 250,
            (false, _) => 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn parse(role: &str) -> Self {
        if role == "admin" {
            Role::Admin
        } else {
            Role::Staff
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Calendar,
    Billing,
    MonthlyExpenses,
    Clients,
    Remainders,
    Attendance,
    Tasks,
}

impl Section {
    /// В порядке отображения в навигации.
    pub const ALL: [Section; 7] = [
        Section::Calendar,
        Section::Billing,
        Section::MonthlyExpenses,
        Section::Clients,
        Section::Remainders,
        Section::Attendance,
        Section::Tasks,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Section::Calendar => "calendar",
            Section::Billing => "billing",
            Section::MonthlyExpenses => "monthly-expenses",
            Section::Clients => "clients",
            Section::Remainders => "remainders",
            Section::Attendance => "attendance",
            Section::Tasks => "tasks",
        }
    }

    pub fn path(&self) -> String {
        format!("{}{}", HOME_PREFIX, self.slug())
    }

    /// Заголовок над контентом.
    pub fn title(&self) -> &'static str {
        match self {
            Section::Calendar => "Calendar",
            Section::Billing => "Billing",
            Section::MonthlyExpenses => "Expenses & Income",
            Section::Clients => "Clients",
            Section::Remainders => "Remainders",
            Section::Attendance => "Attendance",
            Section::Tasks => "Task Manager",
        }
    }

    /// Подпись пункта навигации.
    pub fn label(&self) -> &'static str {
        match self {
            Section::MonthlyExpenses => "Expenses",
            Section::Tasks => "Tasks",
            other => other.title(),
        }
    }

    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            Section::Billing | Section::MonthlyExpenses | Section::Clients | Section::Remainders
        )
    }
}

/// Куда ведёт путь приложения.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Section(Section),
    /// Отчёт посещаемости одного сотрудника, `/home/attendance/{id}`.
    AttendanceReport(String),
    /// Индекс `/home/` перенаправляется в календарь.
    Redirect(Section),
    NotFound,
}

pub fn resolve(path: &str) -> Route {
    let Some(rest) = path.strip_prefix(HOME_PREFIX).or_else(|| (path == "/home").then_some("")) else {
        return Route::NotFound;
    };

    if rest.is_empty() {
        return Route::Redirect(Section::Calendar);
    }
    if let Some(id) = rest.strip_prefix("attendance/") {
        if !id.is_empty() && !id.contains('/') {
            return Route::AttendanceReport(id.to_string());
        }
    }

    Section::ALL
        .into_iter()
        .find(|section| section.slug() == rest)
        .map(Route::Section)
        .unwrap_or(Route::NotFound)
}

/// Раздел по точному пути; вложенные пути заголовка не получают.
pub fn section_for_path(path: &str) -> Option<Section> {
    Section::ALL.into_iter().find(|section| section.path() == path)
}

pub fn section_title(path: &str) -> &'static str {
    section_for_path(path).map(|s| s.title()).unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub section: Section,
    pub path: String,
    pub label: &'static str,
    pub active: bool,
    /// Счётчик непрочитанных задач, только у раздела задач и только если > 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u64>,
}

pub fn nav_items(role: Role, current_path: &str, unread_tasks: u64) -> Vec<NavItem> {
    Section::ALL
        .into_iter()
        .filter(|section| role == Role::Admin || !section.admin_only())
        .map(|section| {
            let path = section.path();
            NavItem {
                section,
                active: path == current_path,
                path,
                label: section.label(),
                badge: (section == Section::Tasks && unread_tasks > 0).then_some(unread_tasks),
            }
        })
        .collect()
}
