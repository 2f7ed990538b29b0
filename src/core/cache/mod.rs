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

//! GS surface cache
//!
//! Sits between emulated GS local memory and the host GPU. The renderer asks
//! it for the surfaces backing each draw, and the memory subsystem tells it
//! about every transfer so cached copies never go silently stale.
//!
//! # Pools
//!
//! - **Render targets**: color buffers the rasterizer draws into, keyed by base
//!   pointer. A frame-buffer lookup may also match the closest target that
//!   starts a little earlier in memory.
//! - **Depth-stencils**: the same for depth buffers.
//! - **Textures**: sampleable surfaces, either uploaded from local memory or
//!   created as views over a render target or depth-stencil.
//!
//! Each pool is an arena ordered by recency (see [`Pool`]). Surfaces own their
//! GPU handle until eviction returns it through [`Device::recycle`].
//!
//! # Invalidation
//!
//! - GPU writes evict overlapping textures outright.
//! - CPU writes queue dirty rectangles on surfaces whose layout can express
//!   them, and evict everything else they overlap.
//! - CPU reads resolve the matching render target back into memory.
//!
//! Memory-backed textures track a single valid rectangle; see
//! [`compute_fetch_rect`] for how dirty rectangles are folded into it.
//!
//! # Example
//!
//! ```
//! use gsrx::core::cache::{CacheConfig, SurfaceCache, TextureRequest};
//! use gsrx::core::device::HeadlessDevice;
//! use gsrx::core::gs::{MemoryDescriptor, Psm};
//! use gsrx::core::memory::LinearMemory;
//!
//! let memory = LinearMemory::new();
//! let mut cache = SurfaceCache::new(HeadlessDevice::new(), CacheConfig::default());
//!
//! let tex0 = MemoryDescriptor::texture(0x2000, 4, Psm::Psmct32, 8, 8);
//! let request = TextureRequest::new(tex0);
//! let first = cache.get_texture(&memory, &request).unwrap();
//! let second = cache.get_texture(&memory, &request).unwrap();
//! assert_eq!(first, second);
//! assert_eq!(cache.stats().textures.hits, 1);
//! ```

mod config;
mod invalidate;
mod palette;
mod pool;
mod reconcile;
mod stats;
mod surface;
mod target;
mod texture;

#[cfg(test)]
mod tests;

pub use config::CacheConfig;
pub use palette::Palette;
pub use pool::{Pool, SurfaceId};
pub use reconcile::{compute_fetch_rect, exclude, Fetch};
pub use stats::{CacheStats, EvictReason, EvictionStats, LookupStats};
pub use surface::{CacheTexture, DepthStencil, DirtyRect, RenderTarget, Surface, TextureSource};
pub use target::{TargetLookup, TargetRequest};
pub use texture::TextureRequest;

use bitflags::bitflags;

use super::device::{Device, SurfaceKind};
use super::error::{CacheError, Result};
use super::geometry::Rect;
use super::memory::{host_bytes_per_pixel, Clut, LocalMemory, CLUT_ENTRIES};

pub type RenderTargetPool = Pool<RenderTarget>;
pub type DepthStencilPool = Pool<DepthStencil>;
pub type TexturePool = Pool<CacheTexture>;

bitflags! {
    /// Selection of pools for [`SurfaceCache::remove`]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Pools: u8 {
        const RENDER_TARGETS = 1 << 0;
        const DEPTH_STENCILS = 1 << 1;
        const TEXTURES = 1 << 2;
    }
}

/// Surface cache over a device backend
///
/// Single-threaded: every operation runs to completion on the renderer's
/// thread. Local memory is passed per call so the cache never holds a
/// borrow of the emulator's memory between operations.
pub struct SurfaceCache<D: Device> {
    pub(crate) device: D,
    pub(crate) config: CacheConfig,
    pub(crate) render_targets: RenderTargetPool,
    pub(crate) depth_stencils: DepthStencilPool,
    pub(crate) textures: TexturePool,

    /// Last palette read from local memory
    pub(crate) clut: Palette,

    pub(crate) stats: CacheStats,
}

impl<D: Device> SurfaceCache<D> {
    pub fn new(device: D, config: CacheConfig) -> Self {
        Self {
            device,
            config,
            render_targets: Pool::new(),
            depth_stencils: Pool::new(),
            textures: Pool::new(),
            clut: Palette::new(CLUT_ENTRIES),
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn render_targets(&self) -> &RenderTargetPool {
        &self.render_targets
    }

    pub fn depth_stencils(&self) -> &DepthStencilPool {
        &self.depth_stencils
    }

    pub fn textures(&self) -> &TexturePool {
        &self.textures
    }

    pub fn render_target(&self, id: SurfaceId) -> Option<&RenderTarget> {
        self.render_targets.get(id)
    }

    pub fn depth_stencil(&self, id: SurfaceId) -> Option<&DepthStencil> {
        self.depth_stencils.get(id)
    }

    pub fn texture(&self, id: SurfaceId) -> Option<&CacheTexture> {
        self.textures.get(id)
    }

    /// Age every surface by one tick and evict the ones past their pool's limit
    ///
    /// An entry survives while its age equals the limit and goes on the
    /// following tick.
    pub fn tick(&mut self) {
        let max_age = self.config.render_target_max_age;
        self.render_targets
            .for_each_mut(|_, rt| rt.surface.age = rt.surface.age.saturating_add(1));
        let expired: Vec<SurfaceId> = self
            .render_targets
            .iter()
            .filter(|(_, rt)| rt.surface.age > max_age)
            .map(|(id, _)| id)
            .collect();
        for id in expired {
            self.evict_render_target(id, EvictReason::Age);
        }

        let max_age = self.config.depth_stencil_max_age;
        self.depth_stencils
            .for_each_mut(|_, ds| ds.surface.age = ds.surface.age.saturating_add(1));
        let expired: Vec<SurfaceId> = self
            .depth_stencils
            .iter()
            .filter(|(_, ds)| ds.surface.age > max_age)
            .map(|(id, _)| id)
            .collect();
        for id in expired {
            self.evict_depth_stencil(id, EvictReason::Age);
        }

        let max_age = self.config.texture_max_age;
        self.textures
            .for_each_mut(|_, t| t.surface.age = t.surface.age.saturating_add(1));
        let expired = self.textures.extract_if(|t| t.surface.age > max_age);
        for texture in expired {
            self.release_texture(texture, EvictReason::Age);
        }
    }

    /// Flush the selected pools
    pub fn remove(&mut self, pools: Pools) {
        if pools.contains(Pools::TEXTURES) {
            for texture in self.textures.drain() {
                self.release_texture(texture, EvictReason::Flush);
            }
        }
        if pools.contains(Pools::RENDER_TARGETS) {
            for id in self.render_targets.ids() {
                self.evict_render_target(id, EvictReason::Flush);
            }
        }
        if pools.contains(Pools::DEPTH_STENCILS) {
            for id in self.depth_stencils.ids() {
                self.evict_depth_stencil(id, EvictReason::Flush);
            }
        }
    }

    /// Flush everything, used on device or context reset
    pub fn remove_all(&mut self) {
        log::debug!(
            "Flushing surface cache ({} render targets, {} depth-stencils, {} textures)",
            self.render_targets.len(),
            self.depth_stencils.len(),
            self.textures.len()
        );
        self.remove(Pools::all());
        self.clut = Palette::new(CLUT_ENTRIES);
    }

    pub(crate) fn evict_texture(&mut self, id: SurfaceId, reason: EvictReason) {
        if let Some(texture) = self.textures.remove(id) {
            self.release_texture(texture, reason);
        }
    }

    /// Return a texture's GPU resources; views leave the source's handle alone
    pub(crate) fn release_texture(&mut self, mut texture: CacheTexture, reason: EvictReason) {
        log::debug!(
            "Evicting texture bp={:#06x} {:?} ({:?})",
            texture.surface.descriptor.bp,
            texture.surface.descriptor.psm,
            reason
        );
        if !texture.is_view() {
            self.device.recycle(texture.surface.texture);
        }
        if let Some(palette) = texture.palette.as_mut() {
            palette.release(&mut self.device);
        }
        self.stats.record_eviction(reason);
    }

    pub(crate) fn evict_render_target(&mut self, id: SurfaceId, reason: EvictReason) {
        let Some(rt) = self.render_targets.remove(id) else {
            return;
        };
        log::debug!(
            "Evicting render target bp={:#06x} {:?} ({:?})",
            rt.surface.descriptor.bp,
            rt.surface.descriptor.psm,
            reason
        );
        self.device.recycle(rt.surface.texture);
        self.stats.record_eviction(reason);
        self.evict_views(TextureSource::RenderTarget(id));
    }

    pub(crate) fn evict_depth_stencil(&mut self, id: SurfaceId, reason: EvictReason) {
        let Some(ds) = self.depth_stencils.remove(id) else {
            return;
        };
        log::debug!(
            "Evicting depth-stencil bp={:#06x} {:?} ({:?})",
            ds.surface.descriptor.bp,
            ds.surface.descriptor.psm,
            reason
        );
        self.device.recycle(ds.surface.texture);
        self.stats.record_eviction(reason);
        self.evict_views(TextureSource::DepthStencil(id));
    }

    /// Drop every texture viewing `source`
    pub(crate) fn evict_views(&mut self, source: TextureSource) {
        let views = self.textures.extract_if(|t| t.source == source);
        for view in views {
            self.release_texture(view, EvictReason::SourceReused);
        }
    }

    /// Count and log a failed allocation, producing the error for the caller
    pub(crate) fn allocation_failure(
        &mut self,
        kind: SurfaceKind,
        width: u32,
        height: u32,
    ) -> CacheError {
        self.stats.allocation_failures += 1;
        log::warn!(
            "Failed to allocate {:?} surface of {}x{}",
            kind,
            width,
            height
        );
        CacheError::AllocationFailure {
            kind,
            width,
            height,
        }
    }
}

/// Copy `rect` of a surface's buffer from local memory into its GPU texture
///
/// `rect` is in GS coordinates and is scaled into device space. Indexed
/// modes are expanded when `palette` is given. Returns the texels read.
pub(crate) fn upload(
    device: &mut dyn Device,
    memory: &dyn LocalMemory,
    surface: &Surface,
    rect: &Rect,
    palette: Option<&Clut>,
) -> Result<i64> {
    if rect.is_empty() {
        return Ok(0);
    }

    let bpp = host_bytes_per_pixel(&surface.descriptor, palette.is_some());
    let data = memory.read(&surface.descriptor, rect, palette);

    if surface.scale.is_identity() {
        device.update_texture(surface.texture, rect, &data, rect.width() as usize * bpp)?;
    } else {
        let target = surface.scale.apply(rect);
        let scaled = resample(
            &data,
            (rect.width() as usize, rect.height() as usize),
            (target.width() as usize, target.height() as usize),
            bpp,
        );
        device.update_texture(surface.texture, &target, &scaled, target.width() as usize * bpp)?;
    }

    Ok(rect.area())
}

/// Nearest-neighbor resize of tightly packed pixels
pub(crate) fn resample(
    src: &[u8],
    (src_w, src_h): (usize, usize),
    (dst_w, dst_h): (usize, usize),
    bpp: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; dst_w * dst_h * bpp];
    if src_w == 0 || src_h == 0 {
        return out;
    }

    for y in 0..dst_h {
        let sy = y * src_h / dst_h;
        for x in 0..dst_w {
            let sx = x * src_w / dst_w;
            let from = (sy * src_w + sx) * bpp;
            let to = (y * dst_w + x) * bpp;
            if let Some(pixel) = src.get(from..from + bpp) {
                out[to..to + bpp].copy_from_slice(pixel);
            }
        }
    }

    out
}
