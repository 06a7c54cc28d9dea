pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod errors;
pub mod forecast;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod seed;
pub mod store;
pub mod timestamp;
pub mod validate;
