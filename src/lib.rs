//! Library crate for reflex-board, exposing modules for binaries and tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod reaction;
pub mod routes;
pub mod services;
pub mod state;
