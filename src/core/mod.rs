// src/core/mod.rs
pub mod catalog;
pub mod engine;
pub mod scoring;
pub mod types;
