pub mod config;
pub mod crawler;
pub mod db;
pub mod model;
pub mod pipeline;
pub mod text;
