pub mod account;
pub mod actor;
pub mod aggregator;
pub mod config;
pub mod fs;
pub mod json;
pub mod provider;
pub mod storage;
