//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed rows decoded from the upstream `raw_news` table.
//! - `repo`: SQL-only functions for reading raw news and writing cleaned news.
//!
//! External modules should import from `news_collector::db`; the repository
//! API and the raw record model are re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{LongNewsRow, RawNewsRecord, ShortNewsRow};
