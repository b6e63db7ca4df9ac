pub mod catalog;
pub mod composer;
pub mod database;
pub mod date_provider;
pub mod error;
pub mod games;
pub mod row_factories;
pub mod scheduler;
pub mod session_store;
pub mod study_service;
