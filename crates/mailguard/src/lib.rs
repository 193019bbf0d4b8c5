//! Mailguard library.
//!
//! Pauses marketing email for Shopify customers carrying a tag by swapping
//! their address for a synthetic one, and puts it back later. Also tags
//! customers on the billing date reported by the subscription partner.
//!
//! # Security
//!
//! This crate holds a Shopify Admin API token with customer write access.
//! The webhook listener binds to localhost by default.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod directory;
pub mod error;
pub mod pacing;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod shopify;
pub mod state;
pub mod store;
