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

//! Texture lookup
//!
//! Lookup order for a sampled texture:
//!
//! 1. Refresh the palette snapshot for indexed modes
//! 2. Reuse a cached texture with the same layout and a compatible clamp
//! 3. View a clean render target that aliases the texture
//! 4. View a used depth-stencil that aliases the texture
//! 5. Upload from local memory

use serde::{Deserialize, Serialize};

use super::palette::Palette;
use super::pool::SurfaceId;
use super::reconcile::{compute_fetch_rect, Fetch};
use super::surface::{CacheTexture, Surface, TextureSource};
use super::{upload, EvictReason, SurfaceCache};
use crate::core::device::{Device, SurfaceKind, TextureFormat, TextureHandle};
use crate::core::error::Result;
use crate::core::geometry::{Rect, Scale};
use crate::core::gs::{Clamp, MemoryDescriptor};
use crate::core::memory::{Clut, LocalMemory};

/// Texture sampling request for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRequest {
    /// TEX0 descriptor
    pub tex0: MemoryDescriptor,

    /// CLAMP state
    #[serde(default)]
    pub clamp: Clamp,

    /// Bounding box of the draw's texel coordinates, when known
    #[serde(default)]
    pub uv: Option<Rect>,
}

impl TextureRequest {
    pub fn new(tex0: MemoryDescriptor) -> Self {
        Self {
            tex0,
            clamp: Clamp::default(),
            uv: None,
        }
    }

    pub fn with_clamp(mut self, clamp: Clamp) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn with_uv(mut self, uv: Rect) -> Self {
        self.uv = Some(uv);
        self
    }
}

/// Per-lookup facts shared by the lookup steps
struct Lookup<'a> {
    request: &'a TextureRequest,
    tex0: MemoryDescriptor,
    extent: Rect,
    sample: Rect,
    indexed: bool,
    palettized: bool,
}

impl<D: Device> SurfaceCache<D> {
    /// Texture to sample for the current draw
    ///
    /// Returns an [`AllocationFailure`](crate::CacheError::AllocationFailure)
    /// when the device cannot provide the texture; nothing is registered then.
    pub fn get_texture(
        &mut self,
        memory: &dyn LocalMemory,
        request: &TextureRequest,
    ) -> Result<SurfaceId> {
        self.stats.textures.lookups += 1;

        let mut tex0 = request.tex0;
        let max_log2 = self.config.max_texture_log2();
        tex0.tw = tex0.tw.min(max_log2);
        tex0.th = tex0.th.min(max_log2);

        let extent = tex0.extent();
        let indexed = tex0.psm.is_indexed();
        let lookup = Lookup {
            request,
            tex0,
            extent,
            sample: request.clamp.sample_rect(&extent, request.uv.as_ref()),
            indexed,
            palettized: indexed && self.config.palettized_textures,
        };

        if indexed {
            let clut = memory.read_palette(&tex0);
            if self.clut.refresh(&clut) {
                log::trace!("Palette at cbp={:#06x} changed", tex0.cbp);
            }
        }

        if let Some(id) = self.find_texture(&lookup) {
            self.stats.textures.hits += 1;
            return self.reuse_texture(memory, id, &lookup);
        }
        self.stats.textures.misses += 1;
        log::trace!("Texture miss bp={:#06x} {:?}", tex0.bp, tex0.psm);

        let stale = self.textures.extract_if(|t| t.surface.descriptor == tex0);
        for texture in stale {
            self.release_texture(texture, EvictReason::Replaced);
        }

        if let Some(id) = self.view_render_target(&lookup)? {
            return Ok(id);
        }
        if let Some(id) = self.view_depth_stencil(&lookup)? {
            return Ok(id);
        }
        self.upload_texture(memory, &lookup)
    }

    fn find_texture(&self, lookup: &Lookup<'_>) -> Option<SurfaceId> {
        let tex0 = &lookup.tex0;
        let clut = self.clut.clut();
        self.textures.find(|t| {
            let desc = &t.surface.descriptor;
            let same_layout = desc.bp == tex0.bp
                && desc.bw == tex0.bw
                && desc.psm == tex0.psm
                && desc.tw == tex0.tw
                && desc.th == tex0.th;
            if !same_layout
                || !t
                    .clamp
                    .interchangeable(&lookup.request.clamp, &lookup.extent, lookup.request.uv.as_ref())
            {
                return false;
            }
            match (&t.palette, lookup.indexed, lookup.palettized) {
                (_, false, _) => true,
                (Some(_), true, true) => true,
                (Some(palette), true, false) => palette.matches(clut),
                (None, true, _) => false,
            }
        })
    }

    fn reuse_texture(
        &mut self,
        memory: &dyn LocalMemory,
        id: SurfaceId,
        lookup: &Lookup<'_>,
    ) -> Result<SurfaceId> {
        self.textures.touch(id);
        let clut = *self.clut.clut();
        let Some(t) = self.textures.get_mut(id) else {
            return Ok(id);
        };
        t.surface.age = 0;

        if lookup.palettized {
            t.surface.descriptor.cbp = lookup.tex0.cbp;
            t.surface.descriptor.cpsm = lookup.tex0.cpsm;
            if let Some(palette) = t.palette.as_mut() {
                if palette.refresh(&clut) {
                    log::trace!("Palette of bp={:#06x} refreshed", lookup.tex0.bp);
                }
                if palette.sync(&mut self.device)? {
                    self.stats.record_upload(palette.entries() as i64);
                }
            }
        }

        if t.is_view() {
            log::trace!("Texture hit bp={:#06x} (view)", lookup.tex0.bp);
            return Ok(id);
        }

        // Bookkeeping is committed only once the device holds the texels
        let mut valid = t.valid;
        let mut dirty = t.surface.dirty.clone();
        let fetch = compute_fetch_rect(&mut valid, &mut dirty, &lookup.sample);
        log::trace!("Texture hit bp={:#06x}: {:?}", lookup.tex0.bp, fetch);
        match fetch.rect() {
            None => self.stats.clean_hits += 1,
            Some(rect) => {
                let expanded = (lookup.indexed && !lookup.palettized).then_some(&clut);
                let texels = upload(&mut self.device, memory, &t.surface, &rect, expanded)?;
                self.stats.record_upload(texels);
            }
        }
        t.valid = valid;
        t.surface.dirty = dirty;
        Ok(id)
    }

    fn view_render_target(&mut self, lookup: &Lookup<'_>) -> Result<Option<SurfaceId>> {
        if lookup.indexed && !lookup.palettized {
            return Ok(None);
        }
        let tex0 = &lookup.tex0;
        let Some(rt_id) = self.render_targets.find(|rt| {
            let desc = &rt.surface.descriptor;
            !rt.surface.is_dirty() && desc.is_compatible(tex0) && desc.shares_bits(tex0)
        }) else {
            return Ok(None);
        };

        self.render_targets.touch(rt_id);
        let Some(rt) = self.render_targets.get_mut(rt_id) else {
            return Ok(None);
        };
        rt.surface.age = 0;
        let (handle, scale) = (rt.surface.texture, rt.surface.scale);
        self.create_view(lookup, TextureSource::RenderTarget(rt_id), handle, scale)
            .map(Some)
    }

    fn view_depth_stencil(&mut self, lookup: &Lookup<'_>) -> Result<Option<SurfaceId>> {
        if lookup.indexed {
            return Ok(None);
        }
        let tex0 = &lookup.tex0;
        let Some(ds_id) = self.depth_stencils.find(|ds| {
            let desc = &ds.surface.descriptor;
            ds.used && !ds.surface.is_dirty() && desc.is_compatible(tex0) && desc.shares_bits(tex0)
        }) else {
            return Ok(None);
        };

        self.depth_stencils.touch(ds_id);
        let Some(ds) = self.depth_stencils.get_mut(ds_id) else {
            return Ok(None);
        };
        ds.surface.age = 0;
        let (handle, scale) = (ds.surface.texture, ds.surface.scale);
        self.create_view(lookup, TextureSource::DepthStencil(ds_id), handle, scale)
            .map(Some)
    }

    /// Register a texture sharing `handle` with its source surface
    fn create_view(
        &mut self,
        lookup: &Lookup<'_>,
        source: TextureSource,
        handle: TextureHandle,
        scale: Scale,
    ) -> Result<SurfaceId> {
        let palette = if lookup.indexed {
            let mut palette = Palette::from_clut(lookup.tex0.psm.palette_entries(), self.clut.clut());
            if palette.sync(&mut self.device).is_err() {
                palette.release(&mut self.device);
                return Err(self.allocation_failure(
                    SurfaceKind::Texture,
                    palette.entries() as u32,
                    1,
                ));
            }
            Some(palette)
        } else {
            None
        };

        log::debug!(
            "Created texture view bp={:#06x} {:?} over {:?}",
            lookup.tex0.bp,
            lookup.tex0.psm,
            source
        );
        self.stats.views += 1;
        Ok(self.textures.insert_front(CacheTexture {
            surface: Surface::new(handle, lookup.tex0, scale),
            clamp: lookup.request.clamp,
            palette,
            valid: lookup.extent,
            source,
        }))
    }

    fn upload_texture(
        &mut self,
        memory: &dyn LocalMemory,
        lookup: &Lookup<'_>,
    ) -> Result<SurfaceId> {
        let width = lookup.extent.width() as u32;
        let height = lookup.extent.height() as u32;
        let format = if lookup.palettized {
            TextureFormat::Index8
        } else {
            TextureFormat::Rgba8
        };
        let Some(handle) = self.device.create_texture(width, height, format) else {
            return Err(self.allocation_failure(SurfaceKind::Texture, width, height));
        };

        let clut = *self.clut.clut();
        let mut texture = CacheTexture {
            surface: Surface::new(handle, lookup.tex0, Scale::IDENTITY),
            clamp: lookup.request.clamp,
            palette: lookup
                .indexed
                .then(|| Palette::from_clut(lookup.tex0.psm.palette_entries(), &clut)),
            valid: Rect::EMPTY,
            source: TextureSource::Memory,
        };

        if let Err(e) = self.fill_texture(memory, &mut texture, lookup, &clut) {
            self.device.recycle(handle);
            if let Some(palette) = texture.palette.as_mut() {
                palette.release(&mut self.device);
            }
            return Err(e);
        }

        log::debug!(
            "Created texture bp={:#06x} bw={} {:?} {}x{}",
            lookup.tex0.bp,
            lookup.tex0.bw,
            lookup.tex0.psm,
            width,
            height
        );
        Ok(self.textures.insert_front(texture))
    }

    /// Initial palette sync and reconciliation of a fresh upload
    fn fill_texture(
        &mut self,
        memory: &dyn LocalMemory,
        texture: &mut CacheTexture,
        lookup: &Lookup<'_>,
        clut: &Clut,
    ) -> Result<()> {
        if lookup.palettized {
            if let Some(palette) = texture.palette.as_mut() {
                if palette.sync(&mut self.device).is_err() {
                    return Err(self.allocation_failure(
                        SurfaceKind::Texture,
                        palette.entries() as u32,
                        1,
                    ));
                }
                self.stats.record_upload(palette.entries() as i64);
            }
        }

        let fetch = compute_fetch_rect(&mut texture.valid, &mut texture.surface.dirty, &lookup.sample);
        if let Fetch::Union(rect) | Fetch::Extend(rect) = fetch {
            let expanded = (lookup.indexed && !lookup.palettized).then_some(clut);
            let texels = upload(&mut self.device, memory, &texture.surface, &rect, expanded)?;
            self.stats.record_upload(texels);
        }
        Ok(())
    }
}
