//! Preceptor tutoring backend library
//!
//! This library provides the core functionality for the Preceptor SAT
//! tutoring backend, including the dialogue engine, the practice question
//! bank, and the HTTP API server.

pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod questions;
pub mod server;
pub mod store;
pub mod tutor;
