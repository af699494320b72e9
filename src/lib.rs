//! Core library for music-stream-preview-client
pub mod config;
pub mod db;
pub mod models;
pub mod auth;
pub mod catalog;
pub mod playback;
pub mod util;
