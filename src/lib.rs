//! Music API - track and playlist storage over HTTP
//!
//! Tracks carry metadata plus an uploaded MP3 whose duration is measured on
//! upload; playlists are named, ordered lists of weighted track references.

pub mod audio;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod model;
pub mod playlist;
pub mod server;
pub mod service;
pub mod storage;

#[cfg(test)]
mod test_utils;
