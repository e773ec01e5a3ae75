//! catfish: mean proportion of sites under positive selection (PSS) per leaf
//!
//! Layers, innermost first:
//! - `domain`: tree model, significance resolvers, PSS aggregation (no I/O)
//! - `application`: result documents, tables, reports, the PSS service
//! - `infrastructure`: filesystem boundary and service wiring
//! - `cli`: argument parsing, dispatch, terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
