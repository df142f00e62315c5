pub mod app;
pub mod browse;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod models;
pub mod storage;
