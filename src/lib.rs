pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod scoring;
