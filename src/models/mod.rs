// src/models/mod.rs

pub mod contribution;
pub mod group;
pub mod question;
pub mod quiz_set;
pub mod session;
pub mod user;
