pub mod catalog;
pub mod common;
pub mod config;
pub mod dashboard;
pub mod order;
pub mod sheet;
