pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod format;
pub mod masking;
pub mod output;
pub mod queries;
pub mod validation;
pub mod verbose;
