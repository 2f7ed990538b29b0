// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Surface cache tuning knobs

use serde::{Deserialize, Serialize};

use crate::core::error::{CacheError, Result};
use crate::core::gs::MAX_TEXTURE_LOG2;

/// Cache configuration that can be saved/loaded
///
/// Missing keys in a TOML file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Ticks a render target may go unused before eviction
    pub render_target_max_age: u32,

    /// Ticks a depth-stencil may go unused before eviction
    pub depth_stencil_max_age: u32,

    /// Ticks a texture may go unused before eviction
    ///
    /// Textures are mostly one-shot per draw, so this is kept short.
    pub texture_max_age: u32,

    /// Largest block distance for the closest-enclosing frame-buffer lookup
    ///
    /// Tuned against games that render to a sub-offset of a known target.
    pub alias_window: u32,

    /// Store a device/GS scale factor per surface
    pub upscale: bool,

    /// Keep indexed textures as indices plus a separate palette texture
    pub palettized_textures: bool,

    /// Largest texture side in pixels
    pub max_texture_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            render_target_max_age: 60,
            depth_stencil_max_age: 60,
            texture_max_age: 2,
            alias_window: 0x700,
            upscale: false,
            palettized_textures: true,
            max_texture_size: 1 << MAX_TEXTURE_LOG2,
        }
    }
}

impl CacheConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| CacheError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CacheError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)
            .map_err(|e| CacheError::Config(format!("Failed to write config file: {}", e)))
    }

    /// Largest texture side as a log2 value
    pub(crate) fn max_texture_log2(&self) -> u8 {
        let size = self.max_texture_size.clamp(1, 1 << MAX_TEXTURE_LOG2);
        (31 - size.leading_zeros()) as u8
    }
}
