//! Service layer for the pair-room matchmaking service
//!
//! This module contains the main application state, startup login and
//! background task management for the production service.

pub mod app;

pub use app::{login, AppState, ServiceError};
