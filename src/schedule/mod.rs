//! Payment-term apportionment, due-date resolution and the obligation store.

pub mod apportion;
pub mod due_date;
pub mod store;
