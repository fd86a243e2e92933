// src/lib.rs

//! Scroll Harvest Library
//!
//! Incremental collection of infinite-scroll tables with checkpoint/resume.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod surface;
pub mod utils;
