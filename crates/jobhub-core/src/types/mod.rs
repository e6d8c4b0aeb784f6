//! Core type definitions used across the JobHub workspace.

pub mod id;

pub use id::JobId;
