pub mod unread_tasks;

pub use unread_tasks::{assignments_of, unread_assignments_of, UnreadTaskCounter, UnreadWatch};
