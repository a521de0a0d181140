pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod forms;
pub mod ipc;
pub mod scheduling;
pub mod sheet;
pub mod store;
pub mod views;
pub mod workbook;
