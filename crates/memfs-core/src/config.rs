// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Store configuration

use serde::{Deserialize, Serialize};

/// Limits applied to namespace operations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLimits {
    /// Longest accepted child name, in bytes
    pub max_name_len: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self { max_name_len: 255 }
    }
}

/// Configuration passed to [`crate::FsStore::new`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Permission bits given to the root directory
    pub root_mode: u32,
    pub limits: StoreLimits,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_mode: 0o777,
            limits: StoreLimits::default(),
        }
    }
}
