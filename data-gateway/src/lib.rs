//! HTTP gateway exposing create/read access to named MongoDB collections.
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;
pub mod startup;
