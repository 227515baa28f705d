// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod contribution;
pub mod files;
pub mod groups;
pub mod quiz;
pub mod quiz_set;
