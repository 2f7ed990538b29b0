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

//! Device backend interface
//!
//! The surface cache never talks to a graphics API directly. It allocates,
//! fills, reads back and releases GPU textures through the [`Device`] trait,
//! and only ever holds opaque [`TextureHandle`]s.
//!
//! # Ownership
//!
//! A handle returned by one of the `create_*` methods is owned by exactly one
//! cached surface until that surface is evicted, at which point it is handed
//! back through [`Device::recycle`]. The backend may later return the same
//! allocation for a request with matching kind, size and format.
//!
//! [`HeadlessDevice`] keeps texel data in host memory and is used by the
//! replay tool, benches and tests.

mod headless;

pub use headless::HeadlessDevice;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::geometry::Rect;

/// Opaque GPU texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Role a GPU surface was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    RenderTarget,
    DepthStencil,
    Texture,
}

/// Host-side texel format of a sampleable texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 32-bit RGBA, used for direct color and expanded palettes
    Rgba8,
    /// 8-bit palette index, used for palettized textures
    Index8,
    /// 32-bit depth
    Depth32,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Depth32 => 4,
            TextureFormat::Index8 => 1,
        }
    }
}

/// Graphics backend collaborator
///
/// Allocation methods return `None` when the backend cannot create the
/// surface; the cache turns that into an allocation failure for the renderer.
pub trait Device {
    /// Allocate a color render target
    fn create_render_target(&mut self, width: u32, height: u32) -> Option<TextureHandle>;

    /// Allocate a depth-stencil surface
    fn create_depth_stencil(&mut self, width: u32, height: u32) -> Option<TextureHandle>;

    /// Allocate a sampleable texture
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Option<TextureHandle>;

    /// Upload `data` into `rect` of a texture
    ///
    /// `pitch` is the byte distance between consecutive rows of `data`.
    fn update_texture(
        &mut self,
        handle: TextureHandle,
        rect: &Rect,
        data: &[u8],
        pitch: usize,
    ) -> Result<()>;

    /// Return a texture to the backend's recycle pool
    fn recycle(&mut self, handle: TextureHandle);

    /// Read `rect` of a texture back to the CPU, tightly packed
    fn readback(&mut self, handle: TextureHandle, rect: &Rect) -> Result<Vec<u8>>;
}
