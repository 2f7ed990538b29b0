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

//! Memory write and read hooks
//!
//! # CPU writes
//!
//! For every cached surface whose memory the transfer touches:
//!
//! | Surface                                   | Action                    |
//! |-------------------------------------------|---------------------------|
//! | Texture view                              | Evict                     |
//! | Same swizzle family and width, whole page rows apart | Queue a translated dirty rect |
//! | Anything else sharing bits                | Evict                     |
//!
//! The translation uses the signed row offset between the two bases, so a
//! surface that starts after the write's destination gets a rectangle from
//! the negative offset. Bases that differ by a partial page row, and
//! rectangles wider than a page row, wrap columns onto other rows and evict.

use super::pool::SurfaceId;
use super::surface::{Surface, TextureSource};
use super::{resample, EvictReason, SurfaceCache};
use crate::core::device::Device;
use crate::core::error::Result;
use crate::core::geometry::Rect;
use crate::core::gs::{BitBltBuf, BlockSpan, MemoryDescriptor};
use crate::core::memory::LocalMemory;

/// Effect of a CPU write on one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Impact {
    None,
    Dirty(Rect),
    Evict,
}

/// A CPU transfer into local memory
struct CpuWrite<'a> {
    dst: MemoryDescriptor,
    rect: &'a Rect,
    span: BlockSpan,
}

impl CpuWrite<'_> {
    fn impact(&self, desc: &MemoryDescriptor, extent: &Rect, is_view: bool) -> Impact {
        if !desc.psm.shares_bits(self.dst.psm) || !desc.span(extent).overlaps(&self.span) {
            return Impact::None;
        }
        if is_view {
            return Impact::Evict;
        }
        let wraps = extent.right > desc.row_width_px() as i32
            || self.rect.right > self.dst.row_width_px() as i32;
        match desc.row_offset_of(&self.dst) {
            Some(dy) if !wraps => {
                let rect = self.rect.offset(0, dy).intersect(extent);
                if rect.is_empty() {
                    Impact::None
                } else {
                    Impact::Dirty(rect)
                }
            }
            _ => Impact::Evict,
        }
    }
}

impl<D: Device> SurfaceCache<D> {
    /// The rasterizer wrote `rect` through `dst` (FRAME or ZBUF)
    ///
    /// Every texture sharing bits with the written blocks is evicted. The
    /// written render target or depth-stencil itself is already current.
    pub fn invalidate_for_gpu_write(&mut self, dst: &MemoryDescriptor, rect: &Rect) {
        let span = dst.span(rect);
        if span.is_empty() {
            return;
        }
        let doomed = self
            .textures
            .extract_if(|t| t.surface.descriptor.psm.shares_bits(dst.psm) && t.span().overlaps(&span));
        for texture in doomed {
            self.release_texture(texture, EvictReason::GpuWrite);
        }
    }

    /// The CPU wrote `rect` into the destination of `bitbltbuf`
    pub fn invalidate_for_cpu_write(&mut self, bitbltbuf: &BitBltBuf, rect: &Rect) {
        let dst = bitbltbuf.destination();
        let write = CpuWrite {
            dst,
            rect,
            span: dst.span(rect),
        };
        if write.span.is_empty() {
            return;
        }

        let mut doomed = Vec::new();
        let mut dirtied = 0u64;

        self.textures.for_each_mut(|id, t| {
            let extent = t.extent();
            match write.impact(&t.surface.descriptor, &extent, t.is_view()) {
                Impact::None => {}
                Impact::Evict => doomed.push(id),
                Impact::Dirty(r) => {
                    log::trace!("Texture bp={:#06x} dirty {:?}", t.surface.descriptor.bp, r);
                    t.surface.push_dirty(dst.psm, r);
                    dirtied += 1;
                }
            }
        });
        for id in doomed.drain(..) {
            self.evict_texture(id, EvictReason::CpuWrite);
        }

        let mut dirty_targets = Vec::new();
        self.render_targets.for_each_mut(|id, rt| {
            match write.impact(&rt.surface.descriptor, &rt.extent, false) {
                Impact::None => {}
                Impact::Evict => doomed.push(id),
                Impact::Dirty(r) => {
                    log::trace!("Render target bp={:#06x} dirty {:?}", rt.surface.descriptor.bp, r);
                    rt.surface.push_dirty(dst.psm, r);
                    dirty_targets.push(id);
                    dirtied += 1;
                }
            }
        });
        for id in doomed.drain(..) {
            self.evict_render_target(id, EvictReason::CpuWrite);
        }
        for id in dirty_targets.drain(..) {
            self.evict_views(TextureSource::RenderTarget(id));
        }

        self.depth_stencils.for_each_mut(|id, ds| {
            match write.impact(&ds.surface.descriptor, &ds.extent, false) {
                Impact::None => {}
                Impact::Evict => doomed.push(id),
                Impact::Dirty(r) => {
                    log::trace!("Depth-stencil bp={:#06x} dirty {:?}", ds.surface.descriptor.bp, r);
                    ds.surface.push_dirty(dst.psm, r);
                    dirty_targets.push(id);
                    dirtied += 1;
                }
            }
        });
        for id in doomed {
            self.evict_depth_stencil(id, EvictReason::CpuWrite);
        }
        for id in dirty_targets {
            self.evict_views(TextureSource::DepthStencil(id));
        }

        self.stats.dirty_rects += dirtied;
    }

    /// The CPU is about to read `rect` from the source of `bitbltbuf`
    ///
    /// Resolves the matching render target into `memory` so the read sees
    /// what was drawn. Pending dirty rectangles are applied to the target
    /// first so newer memory contents are not overwritten. Returns the
    /// resolved target, if any.
    pub fn invalidate_for_cpu_read(
        &mut self,
        memory: &mut dyn LocalMemory,
        bitbltbuf: &BitBltBuf,
        rect: &Rect,
    ) -> Result<Option<SurfaceId>> {
        if rect.is_empty() {
            return Ok(None);
        }
        let src = bitbltbuf.source();

        let found = self.render_targets.iter().find_map(|(id, rt)| {
            let desc = &rt.surface.descriptor;
            if !desc.shares_bits(&src) {
                return None;
            }
            let mut r = *rect;
            // A wider read covers twice the rows of a narrower target
            if src.psm.bpp() > desc.psm.bpp() {
                r.top *= 2;
                r.bottom *= 2;
            }
            rt.extent.contains(&r).then_some((id, r))
        });
        let Some((id, r)) = found else {
            log::trace!("No render target to resolve for bp={:#06x}", src.bp);
            return Ok(None);
        };

        self.refresh_render_target(&*memory, id)?;

        let Some(rt) = self.render_targets.get(id) else {
            return Ok(None);
        };
        let surface: &Surface = &rt.surface;
        let device_rect = surface.scale.apply(&r);
        let mut data = self.device.readback(surface.texture, &device_rect)?;
        if !surface.scale.is_identity() {
            data = resample(
                &data,
                (device_rect.width() as usize, device_rect.height() as usize),
                (r.width() as usize, r.height() as usize),
                4,
            );
        }
        memory.write(&surface.descriptor, &r, &data);

        log::debug!(
            "Resolved render target bp={:#06x} {:?} {:?}",
            surface.descriptor.bp,
            surface.descriptor.psm,
            r
        );
        self.stats.resolves += 1;
        Ok(Some(id))
    }
}
