//! Domain services used by the HTTP routes and the route guard.
//!
//! ARCHITECTURE
//! ============
//! Service modules own backend calls and input rules so route handlers can
//! stay focused on protocol translation and cookie plumbing.

pub mod auth;
pub mod pkce;
pub mod validation;
