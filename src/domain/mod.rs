pub mod completion;
pub mod dates;
pub mod ids;
pub mod keys;
pub mod merge;
pub mod models;
pub mod schedule;
