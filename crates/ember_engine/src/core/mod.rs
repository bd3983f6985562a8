//! Core engine services: configuration and setup glue

pub mod config;
