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

//! Render target and depth-stencil lookup

use serde::{Deserialize, Serialize};

use super::pool::SurfaceId;
use super::surface::{DepthStencil, RenderTarget, Surface, TextureSource};
use super::{upload, CacheStats, EvictReason, SurfaceCache};
use crate::core::device::{Device, SurfaceKind};
use crate::core::error::Result;
use crate::core::geometry::{Rect, Scale};
use crate::core::gs::MemoryDescriptor;
use crate::core::memory::LocalMemory;

/// Why the renderer wants a render target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetLookup {
    /// The current draw renders into it; the stored descriptor follows FRAME
    #[default]
    Draw,
    /// Whatever currently backs the displayed frame buffer
    ///
    /// Never rewrites the stored descriptor and may match a nearby target.
    FrameBuffer,
}

/// Render target or depth-stencil request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRequest {
    /// FRAME or ZBUF descriptor
    pub descriptor: MemoryDescriptor,

    /// Device texture width
    pub width: u32,

    /// Device texture height
    pub height: u32,

    /// GS rows the surface covers (defaults to `height`)
    #[serde(default)]
    pub logical_height: Option<u32>,
}

impl TargetRequest {
    pub fn new(descriptor: MemoryDescriptor, width: u32, height: u32) -> Self {
        Self {
            descriptor,
            width,
            height,
            logical_height: None,
        }
    }

    /// Cover `height` GS rows regardless of the device size
    pub fn with_logical_height(mut self, height: u32) -> Self {
        self.logical_height = Some(height);
        self
    }

    /// Logical GS rectangle: full buffer width by the covered rows
    pub fn extent(&self) -> Rect {
        Rect::with_size(
            self.descriptor.width_px(),
            self.logical_height.unwrap_or(self.height),
        )
    }
}

impl<D: Device> SurfaceCache<D> {
    /// Surface backing the current color buffer, created on miss
    ///
    /// Pending dirty rectangles are uploaded from `memory` before returning.
    /// A frame-buffer miss is seeded from `memory` over its whole extent.
    pub fn get_render_target(
        &mut self,
        memory: &dyn LocalMemory,
        request: &TargetRequest,
        lookup: TargetLookup,
    ) -> Result<SurfaceId> {
        self.stats.render_targets.lookups += 1;
        let bp = request.descriptor.bp;

        let mut found = self
            .render_targets
            .find(|rt| rt.surface.descriptor.bp == bp);
        if lookup == TargetLookup::Draw {
            found = found.filter(|&id| !self.replace_render_target(id, request));
        }
        if found.is_none() && lookup == TargetLookup::FrameBuffer {
            found = self.closest_render_target(bp);
            if found.is_some() {
                self.stats.alias_hits += 1;
            }
        }

        if let Some(id) = found {
            self.stats.render_targets.hits += 1;
            self.render_targets.touch(id);

            let mut reseated = false;
            if let Some(rt) = self.render_targets.get_mut(id) {
                log::trace!("Render target hit bp={:#06x}", rt.surface.descriptor.bp);
                rt.surface.age = 0;
                if lookup == TargetLookup::Draw {
                    reseated = rt.surface.descriptor != request.descriptor;
                    rt.surface.descriptor = request.descriptor;
                    rt.used = true;
                }
                let extent = rt.extent;
                refresh(&mut self.device, &mut self.stats, memory, &mut rt.surface, &extent)?;
            }
            if reseated {
                self.evict_views(TextureSource::RenderTarget(id));
            }
            return Ok(id);
        }

        self.stats.render_targets.misses += 1;
        let Some(texture) = self
            .device
            .create_render_target(request.width, request.height)
        else {
            return Err(self.allocation_failure(
                SurfaceKind::RenderTarget,
                request.width,
                request.height,
            ));
        };

        let extent = request.extent();
        let surface = Surface::new(texture, request.descriptor, self.target_scale(request));
        if lookup == TargetLookup::FrameBuffer {
            match upload(&mut self.device, memory, &surface, &extent, None) {
                Ok(texels) => self.stats.record_upload(texels),
                Err(e) => {
                    self.device.recycle(texture);
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Created render target bp={:#06x} bw={} {:?} {}x{}",
            bp,
            request.descriptor.bw,
            request.descriptor.psm,
            request.width,
            request.height
        );
        Ok(self.render_targets.insert_front(RenderTarget {
            surface,
            used: lookup == TargetLookup::Draw,
            extent,
        }))
    }

    /// Surface backing the current depth buffer, created on miss
    ///
    /// `depth_write` marks the surface as drawn into, which makes it eligible
    /// as a texture source.
    pub fn get_depth_stencil(
        &mut self,
        memory: &dyn LocalMemory,
        request: &TargetRequest,
        depth_write: bool,
    ) -> Result<SurfaceId> {
        self.stats.depth_stencils.lookups += 1;
        let bp = request.descriptor.bp;

        let found = self
            .depth_stencils
            .find(|ds| ds.surface.descriptor.bp == bp)
            .filter(|&id| !self.replace_depth_stencil(id, request));
        if let Some(id) = found {
            self.stats.depth_stencils.hits += 1;
            self.depth_stencils.touch(id);

            let mut reseated = false;
            if let Some(ds) = self.depth_stencils.get_mut(id) {
                log::trace!("Depth-stencil hit bp={:#06x}", bp);
                ds.surface.age = 0;
                reseated = ds.surface.descriptor != request.descriptor;
                ds.surface.descriptor = request.descriptor;
                ds.used |= depth_write;
                let extent = ds.extent;
                refresh(&mut self.device, &mut self.stats, memory, &mut ds.surface, &extent)?;
            }
            if reseated {
                self.evict_views(TextureSource::DepthStencil(id));
            }
            return Ok(id);
        }

        self.stats.depth_stencils.misses += 1;
        let Some(texture) = self
            .device
            .create_depth_stencil(request.width, request.height)
        else {
            return Err(self.allocation_failure(
                SurfaceKind::DepthStencil,
                request.width,
                request.height,
            ));
        };

        log::debug!(
            "Created depth-stencil bp={:#06x} bw={} {:?} {}x{}",
            bp,
            request.descriptor.bw,
            request.descriptor.psm,
            request.width,
            request.height
        );
        let surface = Surface::new(texture, request.descriptor, self.target_scale(request));
        Ok(self.depth_stencils.insert_front(DepthStencil {
            surface,
            used: depth_write,
            extent: request.extent(),
        }))
    }

    /// Apply a render target's pending dirty rectangles
    pub(crate) fn refresh_render_target(
        &mut self,
        memory: &dyn LocalMemory,
        id: SurfaceId,
    ) -> Result<()> {
        if let Some(rt) = self.render_targets.get_mut(id) {
            let extent = rt.extent;
            refresh(&mut self.device, &mut self.stats, memory, &mut rt.surface, &extent)?;
        }
        Ok(())
    }

    /// Evict a render target drawn with a different buffer width
    ///
    /// Its extent no longer covers the drawn rows, so it is rebuilt as a miss.
    fn replace_render_target(&mut self, id: SurfaceId, request: &TargetRequest) -> bool {
        let stale = self
            .render_targets
            .get(id)
            .is_some_and(|rt| rt.surface.descriptor.bw != request.descriptor.bw);
        if stale {
            log::debug!(
                "Render target bp={:#06x} changed width to bw={}",
                request.descriptor.bp,
                request.descriptor.bw
            );
            self.evict_render_target(id, EvictReason::Replaced);
        }
        stale
    }

    fn replace_depth_stencil(&mut self, id: SurfaceId, request: &TargetRequest) -> bool {
        let stale = self
            .depth_stencils
            .get(id)
            .is_some_and(|ds| ds.surface.descriptor.bw != request.descriptor.bw);
        if stale {
            log::debug!(
                "Depth-stencil bp={:#06x} changed width to bw={}",
                request.descriptor.bp,
                request.descriptor.bw
            );
            self.evict_depth_stencil(id, EvictReason::Replaced);
        }
        stale
    }

    /// Render target starting at or before `bp`, closest first, within the alias window
    fn closest_render_target(&self, bp: u32) -> Option<SurfaceId> {
        let window = self.config.alias_window;
        let found = self
            .render_targets
            .iter()
            .filter(|(_, rt)| {
                let base = rt.surface.descriptor.bp;
                base <= bp && bp - base <= window
            })
            .min_by_key(|(_, rt)| bp - rt.surface.descriptor.bp)
            .map(|(id, _)| id);
        if found.is_none() {
            log::trace!("No render target within {:#x} blocks of bp={:#06x}", window, bp);
        }
        found
    }

    fn target_scale(&self, request: &TargetRequest) -> Scale {
        if !self.config.upscale {
            return Scale::IDENTITY;
        }
        let extent = request.extent();
        Scale::from_sizes(
            (request.width, request.height),
            (extent.width() as u32, extent.height() as u32),
        )
    }
}

/// Upload a target's pending dirty rectangles from local memory
///
/// On a failed upload the rectangles not yet uploaded stay queued.
fn refresh(
    device: &mut dyn Device,
    stats: &mut CacheStats,
    memory: &dyn LocalMemory,
    surface: &mut Surface,
    extent: &Rect,
) -> Result<()> {
    let pending = surface.take_dirty();
    for (i, dirty) in pending.iter().enumerate() {
        let rect = dirty.rect.intersect(extent);
        log::trace!("Refreshing {:?} of bp={:#06x}", rect, surface.descriptor.bp);
        match upload(device, memory, surface, &rect, None) {
            Ok(texels) if texels > 0 => stats.record_upload(texels),
            Ok(_) => {}
            Err(e) => {
                surface.dirty.splice(0..0, pending[i..].iter().copied());
                return Err(e);
            }
        }
    }
    Ok(())
}
