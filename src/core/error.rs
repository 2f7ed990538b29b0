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

//! Error types for the surface cache
//!
//! Only conditions the renderer has to react to are surfaced here. Format
//! incompatibilities and alias-window misses are resolved inside the cache
//! as evictions or ordinary misses and never reach the caller.

use thiserror::Error;

use super::device::{SurfaceKind, TextureHandle};

/// Surface cache error type
#[derive(Debug, Error)]
pub enum CacheError {
    /// The device backend could not create a surface of the requested size
    ///
    /// The renderer is expected to degrade gracefully (skip the draw or use a
    /// placeholder) and may retry after `tick`/`remove_all` freed surfaces.
    #[error("failed to allocate {kind:?} surface of {width}x{height}")]
    AllocationFailure {
        kind: SurfaceKind,
        width: u32,
        height: u32,
    },

    /// The device backend could not read a surface back to the CPU
    #[error("failed to read back texture {handle:?}")]
    ReadbackFailure { handle: TextureHandle },

    /// A texture handle was used after it was returned to the device
    #[error("unknown texture handle {handle:?}")]
    UnknownTexture { handle: TextureHandle },

    /// Configuration could not be loaded or saved
    #[error("configuration error: {0}")]
    Config(String),

    /// A replay trace could not be loaded
    #[error("trace error: {0}")]
    Trace(String),
}

/// Result type for surface cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
