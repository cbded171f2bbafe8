//! Sentinel Configuration Module
//!
//! Per-deployment configuration loaded from TOML, replacing hardcoded scan
//! constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `RF_SENTINEL_CONFIG` environment variable (path to TOML file)
//! 2. `sentinel.toml` in the current working directory
//! 3. Built-in defaults (`config::defaults`)
//!
//! The loaded value is passed by reference to whatever needs it; there is no
//! process-wide instance.
//!
//! ```ignore
//! let config = SentinelConfig::load();
//! let orchestrator = ScanOrchestrator::new(&config, store, front_end, sink)?;
//! ```

mod sentinel_config;
pub mod defaults;
pub mod validation;

pub use sentinel_config::*;
