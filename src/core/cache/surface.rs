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

//! Cached surface records
//!
//! Every cached surface wraps a [`Surface`]: a GPU texture handle, the GS
//! memory descriptor it currently represents, an age counter and a queue of
//! CPU writes not yet reflected on the GPU. The three pool entry types add
//! what their role needs on top.
//!
//! # Dirt lifecycle
//!
//! ```text
//! Clean --CPU write--> PartiallyDirty --reconciled--> Clean | PartiallyDirty
//!   |                        |
//!   +--GPU write / incompatible CPU write--> Evicted
//! ```

use super::palette::Palette;
use super::pool::SurfaceId;
use crate::core::device::TextureHandle;
use crate::core::geometry::{Rect, Scale};
use crate::core::gs::{BlockSpan, Clamp, MemoryDescriptor, Psm};

/// A CPU write not yet folded into a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    /// Pixel mode the write went through
    pub psm: Psm,
    /// Affected rectangle in the surface's own GS coordinates
    pub rect: Rect,
}

/// State shared by render targets, depth-stencils and textures
#[derive(Debug)]
pub struct Surface {
    pub(crate) texture: TextureHandle,
    pub(crate) descriptor: MemoryDescriptor,
    pub(crate) age: u32,
    pub(crate) dirty: Vec<DirtyRect>,
    pub(crate) scale: Scale,
}

impl Surface {
    pub(crate) fn new(texture: TextureHandle, descriptor: MemoryDescriptor, scale: Scale) -> Self {
        Self {
            texture,
            descriptor,
            age: 0,
            dirty: Vec::new(),
            scale,
        }
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn descriptor(&self) -> &MemoryDescriptor {
        &self.descriptor
    }

    /// Ticks since the last lookup hit
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Pending CPU writes, oldest first
    pub fn dirty(&self) -> &[DirtyRect] {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Device pixels per GS pixel
    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub(crate) fn push_dirty(&mut self, psm: Psm, rect: Rect) {
        if !rect.is_empty() {
            self.dirty.push(DirtyRect { psm, rect });
        }
    }

    pub(crate) fn take_dirty(&mut self) -> Vec<DirtyRect> {
        std::mem::take(&mut self.dirty)
    }
}

/// Color buffer the rasterizer draws into
#[derive(Debug)]
pub struct RenderTarget {
    pub(crate) surface: Surface,
    pub(crate) used: bool,
    pub(crate) extent: Rect,
}

impl RenderTarget {
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Whether the rasterizer drew into it since creation
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Logical GS rectangle backed by this surface
    pub fn extent(&self) -> Rect {
        self.extent
    }
}

/// Depth buffer the rasterizer tests against
#[derive(Debug)]
pub struct DepthStencil {
    pub(crate) surface: Surface,
    pub(crate) used: bool,
    pub(crate) extent: Rect,
}

impl DepthStencil {
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Whether depth writes were enabled on it since creation
    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }
}

/// Where a cached texture's texels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    /// Uploaded from local memory; owns its GPU texture
    Memory,
    /// View over a render target's GPU texture
    RenderTarget(SurfaceId),
    /// View over a depth-stencil's GPU texture
    DepthStencil(SurfaceId),
}

/// Sampleable texture
#[derive(Debug)]
pub struct CacheTexture {
    pub(crate) surface: Surface,
    pub(crate) clamp: Clamp,
    pub(crate) palette: Option<Palette>,
    pub(crate) valid: Rect,
    pub(crate) source: TextureSource,
}

impl CacheTexture {
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn clamp(&self) -> &Clamp {
        &self.clamp
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Part of the texture known to match local memory
    pub fn valid_region(&self) -> Rect {
        self.valid
    }

    pub fn source(&self) -> TextureSource {
        self.source
    }

    /// Whether this texture borrows a render target or depth-stencil texture
    pub fn is_view(&self) -> bool {
        self.source != TextureSource::Memory
    }

    /// Full addressable rectangle from TEX0
    pub fn extent(&self) -> Rect {
        self.surface.descriptor.extent()
    }

    pub(crate) fn span(&self) -> BlockSpan {
        self.surface.descriptor.span(&self.extent())
    }
}
