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

//! Host-memory device backend
//!
//! Stores every texture as a byte vector and recycles released textures by
//! `(kind, width, height, format)`. An optional budget caps the number of
//! allocations so allocation failures can be exercised.

use std::collections::HashMap;

use super::{Device, SurfaceKind, TextureFormat, TextureHandle};
use crate::core::error::{CacheError, Result};
use crate::core::geometry::Rect;

type PoolKey = (SurfaceKind, u32, u32, TextureFormat);

struct HostTexture {
    key: PoolKey,
    data: Vec<u8>,
}

impl HostTexture {
    fn width(&self) -> u32 {
        self.key.1
    }

    fn height(&self) -> u32 {
        self.key.2
    }

    fn bpp(&self) -> usize {
        self.key.3.bytes_per_pixel()
    }

    fn bounds(&self) -> Rect {
        Rect::with_size(self.width(), self.height())
    }
}

/// CPU-side implementation of [`Device`]
///
/// # Example
///
/// ```
/// use gsrx::core::device::{Device, HeadlessDevice};
///
/// let mut device = HeadlessDevice::new();
/// let rt = device.create_render_target(640, 448).unwrap();
/// device.recycle(rt);
/// assert_eq!(device.live_count(), 0);
/// assert_eq!(device.pooled_count(), 1);
/// ```
#[derive(Default)]
pub struct HeadlessDevice {
    live: HashMap<TextureHandle, HostTexture>,
    pool: Vec<(TextureHandle, HostTexture)>,
    next_handle: u32,
    budget: Option<usize>,

    created: u64,
    reused: u64,
    uploads: u64,
    uploaded_bytes: u64,
    readbacks: u64,
    invalid_recycles: u64,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of allocations held (live plus pooled)
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Self::default()
        }
    }

    /// Textures currently owned by callers
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Released textures waiting in the recycle pool
    pub fn pooled_count(&self) -> usize {
        self.pool.len()
    }

    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Number of fresh allocations (recycled ones excluded)
    pub fn created_count(&self) -> u64 {
        self.created
    }

    pub fn reused_count(&self) -> u64 {
        self.reused
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn readback_count(&self) -> u64 {
        self.readbacks
    }

    /// Recycle calls for handles that were not live (double frees)
    pub fn invalid_recycle_count(&self) -> u64 {
        self.invalid_recycles
    }

    /// Size of a live texture
    pub fn size_of(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.live.get(&handle).map(|t| (t.width(), t.height()))
    }

    /// Raw texel bytes of a live texture
    pub fn data(&self, handle: TextureHandle) -> Option<&[u8]> {
        self.live.get(&handle).map(|t| t.data.as_slice())
    }

    fn allocate(&mut self, key: PoolKey) -> Option<TextureHandle> {
        if let Some(pos) = self.pool.iter().position(|(_, t)| t.key == key) {
            let (handle, texture) = self.pool.swap_remove(pos);
            self.live.insert(handle, texture);
            self.reused += 1;
            return Some(handle);
        }

        if self
            .budget
            .is_some_and(|budget| self.live.len() + self.pool.len() >= budget)
        {
            // Drop pooled allocations before giving up
            if self.pool.is_empty() {
                log::warn!(
                    "Device budget exhausted, cannot allocate {:?} {}x{}",
                    key.0,
                    key.1,
                    key.2
                );
                return None;
            }
            self.pool.clear();
        }

        if key.1 == 0 || key.2 == 0 {
            return None;
        }

        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        let len = key.1 as usize * key.2 as usize * key.3.bytes_per_pixel();
        self.live.insert(
            handle,
            HostTexture {
                key,
                data: vec![0; len],
            },
        );
        self.created += 1;
        Some(handle)
    }
}

impl Device for HeadlessDevice {
    fn create_render_target(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        self.allocate((SurfaceKind::RenderTarget, width, height, TextureFormat::Rgba8))
    }

    fn create_depth_stencil(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        self.allocate((SurfaceKind::DepthStencil, width, height, TextureFormat::Depth32))
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Option<TextureHandle> {
        self.allocate((SurfaceKind::Texture, width, height, format))
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        rect: &Rect,
        data: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let texture = self
            .live
            .get_mut(&handle)
            .ok_or(CacheError::UnknownTexture { handle })?;

        let bpp = texture.bpp();
        let stride = texture.width() as usize * bpp;
        let clipped = rect.intersect(&texture.bounds());
        if clipped.is_empty() {
            return Ok(());
        }
        let row_bytes = clipped.width() as usize * bpp;
        let skip_x = (clipped.left - rect.left) as usize * bpp;
        let skip_y = (clipped.top - rect.top) as usize;

        for row in 0..clipped.height() as usize {
            let src = (skip_y + row) * pitch + skip_x;
            let Some(src_row) = data.get(src..src + row_bytes) else {
                break;
            };
            let dst = (clipped.top as usize + row) * stride + clipped.left as usize * bpp;
            texture.data[dst..dst + row_bytes].copy_from_slice(src_row);
        }

        self.uploads += 1;
        self.uploaded_bytes += (row_bytes * clipped.height() as usize) as u64;
        Ok(())
    }

    fn recycle(&mut self, handle: TextureHandle) {
        match self.live.remove(&handle) {
            Some(texture) => self.pool.push((handle, texture)),
            None => {
                log::warn!("Recycle of unknown texture {:?}", handle);
                self.invalid_recycles += 1;
            }
        }
    }

    fn readback(&mut self, handle: TextureHandle, rect: &Rect) -> Result<Vec<u8>> {
        let texture = self
            .live
            .get(&handle)
            .ok_or(CacheError::ReadbackFailure { handle })?;

        let bpp = texture.bpp();
        let stride = texture.width() as usize * bpp;
        let clipped = rect.intersect(&texture.bounds());
        let row_bytes = rect.width() as usize * bpp;
        let mut out = vec![0u8; row_bytes * rect.height() as usize];

        for y in clipped.top..clipped.bottom {
            let src = y as usize * stride + clipped.left as usize * bpp;
            let len = clipped.width() as usize * bpp;
            let dst = (y - rect.top) as usize * row_bytes + (clipped.left - rect.left) as usize * bpp;
            out[dst..dst + len].copy_from_slice(&texture.data[src..src + len]);
        }

        self.readbacks += 1;
        Ok(out)
    }
}
