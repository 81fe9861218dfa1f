//! # BrandPulse Services
//!
//! Thin reqwest-backed implementations of the collaborator traits. Each
//! call is a single JSON POST against the configured backend; the backend
//! upserts, so repeating a call after a mid-flight failure is safe.

pub mod backend;

pub use backend::{collaborators, BackendClient};
