pub mod availability;
pub mod calendar;
pub mod catalog;
pub mod coordinator;
pub mod slots;
