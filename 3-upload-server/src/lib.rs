//! File ingestion endpoint.
//!
//! - [`cli`] parses the listen address, upload directory and allow-list.
//! - [`storage`] decides which filenames are acceptable and where they go.
//! - [`routes`] exposes `POST /api/upload`.

pub mod cli;
pub mod routes;
pub mod storage;
