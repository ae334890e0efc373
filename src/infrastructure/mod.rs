pub mod backup_file;
pub mod command_log;
pub mod config;
pub mod error;
pub mod storage;
