//! Credential check endpoint.
//!
//! - [`cli`] parses the listen address and user file location.
//! - [`credentials`] loads users and verifies secrets against SHA-256 digests.
//! - [`routes`] exposes `POST /api/login`.

pub mod cli;
pub mod credentials;
pub mod routes;
