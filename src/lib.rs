//! Library crate for tourney-desk, exposing modules for binaries and integration tests.

pub mod bracket;
pub mod challonge;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
