//! Application services layer scaffolding.

pub mod admin;
pub mod blog;
pub mod error;
pub mod repos;
