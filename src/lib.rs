//! Brezza: a small blog server.
//!
//! The crate is layered the usual way: `domain` holds the entity records,
//! `application` plans queries and projects records into display shapes,
//! `infra` owns the PostgreSQL adapters and the HTTP surface, and
//! `presentation` renders the projections through askama templates.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
