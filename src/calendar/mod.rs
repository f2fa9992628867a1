//! Синхронизация экрана календаря с таблицей событий.

pub mod collection;
pub mod color;
pub mod display;
pub mod draft;
pub mod normalize;
pub mod query;
pub mod service;

pub use collection::{EventCollection, FetchOutcome, MutationOutcome, Stamp};
pub use color::category_color;
pub use display::{DisplayEvent, ExtendedProps};
pub use draft::{DateSelection, EventDraft, EventMove, FormMode, MoveGesture};
pub use query::{EventQuery, ALL_CATEGORIES};
pub use service::CalendarService;
