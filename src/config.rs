//! Centralized configuration and builder for the VSS store reader.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - VssConfig::from_env() reads the VSS_* variables; VssConfigBuilder
//!   overrides them programmatically.
//!
//! Tunables:
//! - max_chain_blocks: cap on blocks visited while walking one on-disk chain
//!   (catalog, diff area table, bitmap, location table).
//! - strict_location_table: treat a non-empty diff area location table as a
//!   hard NotSupported error instead of a logged degradation.
//! - index_offset: where the snapshots index header lives (0x1E00 on a
//!   volume; images cut with a leading gap may need another value).

use std::fmt;

use crate::consts::{DEFAULT_MAX_CHAIN_BLOCKS, INDEX_HEADER_OFFSET};

/// Top-level configuration for parsing a VSS store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VssConfig {
    /// Maximum number of blocks visited in a single chain.
    /// Env: VSS_MAX_CHAIN_BLOCKS (default 1_000_000)
    pub max_chain_blocks: usize,

    /// Fail with NotSupported when a diff area location table holds items.
    /// Env: VSS_STRICT_LOCATION_TABLE = 0|1|true|false (default false)
    pub strict_location_table: bool,

    /// Absolute offset of the snapshots index header.
    /// Env: VSS_INDEX_OFFSET (decimal or 0x-prefixed hex, default 0x1E00)
    pub index_offset: u64,
}

impl Default for VssConfig {
    fn default() -> Self {
        Self {
            max_chain_blocks: DEFAULT_MAX_CHAIN_BLOCKS,
            strict_location_table: false,
            index_offset: INDEX_HEADER_OFFSET,
        }
    }
}

fn parse_bool(s: &str) -> bool {
    let s = s.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

fn parse_u64(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(x) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(x, 16).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

impl VssConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("VSS_MAX_CHAIN_BLOCKS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.max_chain_blocks = n;
                }
            }
        }

        if let Ok(v) = std::env::var("VSS_STRICT_LOCATION_TABLE") {
            cfg.strict_location_table = parse_bool(&v);
        }

        if let Ok(v) = std::env::var("VSS_INDEX_OFFSET") {
            if let Some(n) = parse_u64(&v) {
                cfg.index_offset = n;
            }
        }

        cfg
    }

    /// Start a builder seeded from the environment.
    pub fn builder() -> VssConfigBuilder {
        VssConfigBuilder::new()
    }
}

impl fmt::Display for VssConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_chain_blocks={}, strict_location_table={}, index_offset={:#x}",
            self.max_chain_blocks, self.strict_location_table, self.index_offset
        )
    }
}

/// Builder for VssConfig (env defaults + explicit overrides).
#[derive(Clone, Debug)]
pub struct VssConfigBuilder {
    cfg: VssConfig,
}

impl Default for VssConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VssConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: VssConfig::from_env(),
        }
    }

    /// Start from compiled-in defaults, ignoring the environment.
    pub fn from_defaults() -> Self {
        Self {
            cfg: VssConfig::default(),
        }
    }

    pub fn max_chain_blocks(mut self, n: usize) -> Self {
        self.cfg.max_chain_blocks = n.max(1);
        self
    }

    pub fn strict_location_table(mut self, on: bool) -> Self {
        self.cfg.strict_location_table = on;
        self
    }

    pub fn index_offset(mut self, offset: u64) -> Self {
        self.cfg.index_offset = offset;
        self
    }

    pub fn build(self) -> VssConfig {
        self.cfg
    }
}
