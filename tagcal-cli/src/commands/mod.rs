pub mod permission;
pub mod recurrence;
pub mod remind;
