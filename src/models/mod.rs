pub mod event;
pub mod row_id;

pub use event::{Category, EventPayload, EventRow, SchedulePatch};
pub use row_id::RowId;
