pub mod canon;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod import;
pub mod plan;
pub mod reference;
pub mod resolution;
pub mod types;
