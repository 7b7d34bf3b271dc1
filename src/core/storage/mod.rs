// src/core/storage/mod.rs

pub mod durable;
pub mod entry;
pub mod memory;
pub mod paths;
