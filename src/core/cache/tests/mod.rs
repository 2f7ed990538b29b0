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

//! Surface cache behavior tests

mod scenarios;
mod textures;

use crate::core::cache::{CacheConfig, SurfaceCache, TargetLookup, TargetRequest};
use crate::core::cache::SurfaceId;
use crate::core::device::{Device, HeadlessDevice, TextureFormat, TextureHandle};
use crate::core::error::Result;
use crate::core::geometry::Rect;
use crate::core::gs::{MemoryDescriptor, Psm};
use crate::core::memory::{LinearMemory, LocalMemory};
use crate::CacheError;

fn cache() -> SurfaceCache<HeadlessDevice> {
    SurfaceCache::new(HeadlessDevice::new(), CacheConfig::default())
}

fn cache_with(config: CacheConfig) -> SurfaceCache<HeadlessDevice> {
    SurfaceCache::new(HeadlessDevice::new(), config)
}

/// Store one repeated host pixel over `rect`
fn fill(memory: &mut LinearMemory, desc: &MemoryDescriptor, rect: &Rect, pixel: [u8; 4]) {
    let data: Vec<u8> = (0..rect.area()).flat_map(|_| pixel).collect();
    memory.write(desc, rect, &data);
}

/// Store palette entry `index` of a CT32 palette at `cbp`
fn write_palette_entry(memory: &mut LinearMemory, cbp: u32, index: u32, color: u32) {
    let clut = MemoryDescriptor::buffer(cbp, 1, Psm::Psmct32);
    let (x, y) = ((index % 16) as i32, (index / 16) as i32);
    memory.write(&clut, &Rect::new(x, y, x + 1, y + 1), &color.to_le_bytes());
}

/// Draw into a render target covering `width` by `height` GS pixels
fn draw_target(
    cache: &mut SurfaceCache<HeadlessDevice>,
    memory: &LinearMemory,
    frame: MemoryDescriptor,
    width: u32,
    height: u32,
) -> SurfaceId {
    cache
        .get_render_target(memory, &TargetRequest::new(frame, width, height), TargetLookup::Draw)
        .unwrap()
}

/// Headless device that fails one texture update after `fail_after` successes
#[derive(Default)]
struct FlakyDevice {
    inner: HeadlessDevice,
    fail_after: Option<u32>,
}

impl Device for FlakyDevice {
    fn create_render_target(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        self.inner.create_render_target(width, height)
    }

    fn create_depth_stencil(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        self.inner.create_depth_stencil(width, height)
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Option<TextureHandle> {
        self.inner.create_texture(width, height, format)
    }

    fn update_texture(
        &mut self,
        handle: TextureHandle,
        rect: &Rect,
        data: &[u8],
        pitch: usize,
    ) -> Result<()> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                return Err(CacheError::UnknownTexture { handle });
            }
            Some(n) => self.fail_after = Some(n - 1),
            None => {}
        }
        self.inner.update_texture(handle, rect, data, pitch)
    }

    fn recycle(&mut self, handle: TextureHandle) {
        self.inner.recycle(handle)
    }

    fn readback(&mut self, handle: TextureHandle, rect: &Rect) -> Result<Vec<u8>> {
        self.inner.readback(handle, rect)
    }
}

fn flaky_cache() -> SurfaceCache<FlakyDevice> {
    SurfaceCache::new(FlakyDevice::default(), CacheConfig::default())
}
