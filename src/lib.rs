//! # xvsa-jfe
//!
//! Drives the xvsa Java front-end (`mapfej`) over a module's compiled classes
//! and its dependency jars, reusing library objects that other modules of the
//! same build already produced.
//!
//! ## Architecture
//!
//! - **recorder**: Merges JSON source-file lists across runs into one manifest
//! - **naming**: Library object and per-module list file names
//! - **filter**: Jar selection policy and the class filter passed to the tool
//! - **command**: Command lines for verification, application and library runs
//! - **runner**: Process execution behind a substitutable trait
//! - **manifest**: Newline-separated list files for downstream consumers
//! - **scan**: Source file and jar discovery
//! - **orchestrator**: The per-module generation pass and library object cache
//! - **workspace**: Sequential or parallel multi-module plans
//! - **config**: Settings from flags, `XVSA_*` variables and defaults
//! - **cli**: Command-line definitions
//! - **error**: Error taxonomy

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod manifest;
pub mod naming;
pub mod orchestrator;
pub mod recorder;
pub mod runner;
pub mod scan;
pub mod workspace;
