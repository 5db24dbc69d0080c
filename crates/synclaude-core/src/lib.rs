//! synclaude core - model catalog and Claude Code launcher
//!
//! This crate provides the core functionality for the synclaude CLI:
//! - Model records parsed from a remote catalog
//! - A TTL file cache with cache-first access through `ModelCoordinator`
//! - Environment composition and supervised launch of Claude Code
//! - Timeout-guarded probes of the installed Claude Code
//! - TOML configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod launcher;
pub mod models;
pub mod process_utils;
pub mod tool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigManager};
pub use error::{CatalogError, Error, RecordError, Result};
pub use launcher::{
    compose_environment, normalize_model_id, run_aux_command, AuxOutcome, Endpoint,
    LaunchEnvironment, LaunchOutcome, LaunchRequest, LaunchedProcess, ProcessLauncher, Tier,
    TierSelection,
};
pub use models::{
    CacheInfo, CatalogSource, HttpCatalogFetcher, ModelCache, ModelCoordinator, ModelRecord,
};
pub use tool::{ClaudeCodeManager, ToolStatus};
