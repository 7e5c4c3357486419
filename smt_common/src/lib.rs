//! SMT Common Library
//!
//! Shared types for the single-motion test workspace: the packed axis status
//! word, the catalog of axis attributes, the channel trait through which every
//! read and write travels, and the TOML configuration loader.
//!
//! # Module Structure
//!
//! - [`status`] - Status word bitflags, decoded view and text rendering
//! - [`attribute`] - Named axis attributes and their channel field suffixes
//! - [`channel`] - `AxisChannel` trait and `ChannelError`
//! - [`config`] - Configuration loading traits and suite configuration
//! - [`consts`] - Default budgets and cadences
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! smt_common = { path = "../smt_common" }
//! ```
//!
//! ```rust
//! use smt_common::prelude::*;
//! ```

pub mod attribute;
pub mod channel;
pub mod config;
pub mod consts;
pub mod prelude;
pub mod status;
