//! Motionphoto - extract the video clip embedded in motion photos
//!
//! This library crate exposes the command implementations for integration testing.

pub mod config;
pub mod extract;
pub mod inspect;
