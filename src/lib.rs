//! Ranked-play client for the courtside platform: court snapshots, action classification,
//! guarded mutations and the periodic refresh that keeps the action center current.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
