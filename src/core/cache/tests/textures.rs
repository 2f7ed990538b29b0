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

//! Texture lookup tests

use super::*;
use crate::core::cache::{TextureRequest, TextureSource};
use crate::core::device::SurfaceKind;
use crate::core::gs::{BitBltBuf, Clamp, WrapMode};
use crate::CacheError;

fn ct32_texture(bp: u32) -> MemoryDescriptor {
    MemoryDescriptor::texture(bp, 4, Psm::Psmct32, 8, 8)
}

#[test]
fn test_clean_hit_is_idempotent() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let request = TextureRequest::new(ct32_texture(0x2000));

    let first = cache.get_texture(&memory, &request).unwrap();
    let valid = cache.texture(first).unwrap().valid_region();
    let uploads = cache.device().upload_count();

    let second = cache.get_texture(&memory, &request).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.texture(second).unwrap().valid_region(), valid);
    assert_eq!(cache.device().upload_count(), uploads);
    assert_eq!(cache.stats().clean_hits, 1);
}

#[test]
fn test_upload_covers_sampled_rect_only() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let request = TextureRequest::new(ct32_texture(0x2000)).with_uv(Rect::new(0, 0, 32, 16));

    let id = cache.get_texture(&memory, &request).unwrap();
    let texture = cache.texture(id).unwrap();
    assert_eq!(texture.source(), TextureSource::Memory);
    assert_eq!(texture.valid_region(), Rect::new(0, 0, 32, 16));
    assert_eq!(cache.stats().uploaded_texels, 32 * 16);

    // Sampling further right extends the valid band instead of refetching
    let wider = TextureRequest::new(ct32_texture(0x2000)).with_uv(Rect::new(16, 0, 64, 16));
    assert_eq!(cache.get_texture(&memory, &wider).unwrap(), id);
    assert_eq!(cache.texture(id).unwrap().valid_region(), Rect::new(0, 0, 64, 16));
    assert_eq!(cache.stats().uploaded_texels, 64 * 16);
}

#[test]
fn test_uploaded_texels_match_memory() {
    let mut memory = LinearMemory::new();
    let tex0 = ct32_texture(0x2000);
    fill(&mut memory, &tex0, &Rect::with_size(256, 256), [10, 20, 30, 40]);

    let mut cache = cache();
    let id = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();
    let handle = cache.texture(id).unwrap().surface().texture();
    let data = cache.device().data(handle).unwrap();
    assert!(data.chunks_exact(4).all(|p| p == [10, 20, 30, 40]));
}

#[test]
fn test_clamp_mismatch_tolerated_inside_both_regions() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let uv = Rect::new(8, 8, 64, 64);
    let repeat = TextureRequest::new(ct32_texture(0x2000)).with_uv(uv);
    let clamp = repeat.with_clamp(Clamp::new(WrapMode::Clamp, WrapMode::Clamp));

    let a = cache.get_texture(&memory, &repeat).unwrap();
    let b = cache.get_texture(&memory, &clamp).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_clamp_mismatch_replaces_when_wrapping_matters() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let uv = Rect::new(-16, 0, 300, 64);
    let repeat = TextureRequest::new(ct32_texture(0x2000)).with_uv(uv);
    let clamp = repeat.with_clamp(Clamp::new(WrapMode::Clamp, WrapMode::Clamp));

    let a = cache.get_texture(&memory, &repeat).unwrap();
    let b = cache.get_texture(&memory, &clamp).unwrap();
    assert_ne!(a, b);
    assert!(cache.texture(a).is_none());
    assert_eq!(cache.textures().len(), 1);
    assert_eq!(cache.stats().evictions.replaced, 1);
}

#[test]
fn test_view_over_clean_render_target() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let rt = draw_target(&mut cache, &memory, MemoryDescriptor::buffer(0, 4, Psm::Psmct32), 256, 256);
    let rt_handle = cache.render_target(rt).unwrap().surface().texture();

    let id = cache.get_texture(&memory, &TextureRequest::new(ct32_texture(0))).unwrap();
    let texture = cache.texture(id).unwrap();
    assert_eq!(texture.source(), TextureSource::RenderTarget(rt));
    assert_eq!(texture.surface().texture(), rt_handle);
    assert_eq!(texture.valid_region(), Rect::with_size(256, 256));
    assert_eq!(cache.stats().views, 1);
    assert_eq!(cache.stats().uploads, 0);
}

#[test]
fn test_dirty_render_target_is_not_viewed() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    draw_target(&mut cache, &memory, MemoryDescriptor::buffer(0, 4, Psm::Psmct32), 256, 256);
    cache.invalidate_for_cpu_write(
        &crate::core::gs::BitBltBuf::both(0, 4, Psm::Psmct32),
        &Rect::new(0, 0, 16, 16),
    );

    let id = cache.get_texture(&memory, &TextureRequest::new(ct32_texture(0))).unwrap();
    assert_eq!(cache.texture(id).unwrap().source(), TextureSource::Memory);
}

#[test]
fn test_view_over_used_depth_stencil_only() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let zbuf = MemoryDescriptor::buffer(0x1000, 4, Psm::Psmz32);
    let request = TargetRequest::new(zbuf, 256, 256);
    let tex0 = MemoryDescriptor::texture(0x1000, 4, Psm::Psmz32, 8, 8);

    let ds = cache.get_depth_stencil(&memory, &request, false).unwrap();
    let unused = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();
    assert_eq!(cache.texture(unused).unwrap().source(), TextureSource::Memory);

    cache.get_depth_stencil(&memory, &request, true).unwrap();
    cache.invalidate_for_gpu_write(&zbuf, &Rect::with_size(256, 256));
    assert!(cache.texture(unused).is_none());

    let view = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();
    assert_eq!(cache.texture(view).unwrap().source(), TextureSource::DepthStencil(ds));
}

#[test]
fn test_palettized_texture_refreshes_palette_in_place() {
    let mut memory = LinearMemory::new();
    let mut cache = cache();
    let tex0 = MemoryDescriptor::texture(0x1000, 2, Psm::Psmt8, 7, 7).with_palette(0x3000, Psm::Psmct32);
    let request = TextureRequest::new(tex0);
    write_palette_entry(&mut memory, 0x3000, 3, 0x11223344);

    let id = cache.get_texture(&memory, &request).unwrap();
    let palette = cache.texture(id).unwrap().palette().unwrap();
    assert_eq!(palette.entries(), 256);
    let handle = palette.texture().unwrap();
    assert_eq!(&cache.device().data(handle).unwrap()[12..16], &0x11223344u32.to_le_bytes());

    write_palette_entry(&mut memory, 0x3000, 3, 0x55667788);
    let uploads = cache.device().upload_count();
    assert_eq!(cache.get_texture(&memory, &request).unwrap(), id);
    assert_eq!(cache.device().upload_count(), uploads + 1);
    assert_eq!(&cache.device().data(handle).unwrap()[12..16], &0x55667788u32.to_le_bytes());

    // Unchanged palette: no upload at all
    cache.get_texture(&memory, &request).unwrap();
    assert_eq!(cache.device().upload_count(), uploads + 1);
}

#[test]
fn test_expanded_palette_mismatch_is_a_miss() {
    let mut memory = LinearMemory::new();
    let mut cache = cache_with(CacheConfig {
        palettized_textures: false,
        ..Default::default()
    });
    let tex0 = MemoryDescriptor::texture(0x1000, 2, Psm::Psmt8, 7, 7).with_palette(0x3000, Psm::Psmct32);
    let request = TextureRequest::new(tex0);
    write_palette_entry(&mut memory, 0x3000, 0, 0xFF0000FF);

    let a = cache.get_texture(&memory, &request).unwrap();
    let handle = cache.texture(a).unwrap().surface().texture();
    // Every index is 0, so every texel is palette entry 0
    assert!(cache
        .device()
        .data(handle)
        .unwrap()
        .chunks_exact(4)
        .all(|p| p == 0xFF0000FFu32.to_le_bytes()));

    assert_eq!(cache.get_texture(&memory, &request).unwrap(), a);

    write_palette_entry(&mut memory, 0x3000, 0, 0xFF00FF00);
    let b = cache.get_texture(&memory, &request).unwrap();
    assert_ne!(a, b);
    assert_eq!(cache.textures().len(), 1);
    assert_eq!(cache.stats().evictions.replaced, 1);
}

#[test]
fn test_texture_allocation_failure() {
    let memory = LinearMemory::new();
    let mut cache = SurfaceCache::new(HeadlessDevice::with_budget(0), CacheConfig::default());
    let err = cache
        .get_texture(&memory, &TextureRequest::new(ct32_texture(0)))
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::AllocationFailure {
            kind: SurfaceKind::Texture,
            ..
        }
    ));
    assert!(cache.textures().is_empty());
}

#[test]
fn test_palette_allocation_failure_returns_main_texture() {
    let memory = LinearMemory::new();
    let mut cache = SurfaceCache::new(HeadlessDevice::with_budget(1), CacheConfig::default());
    let tex0 = MemoryDescriptor::texture(0x1000, 2, Psm::Psmt8, 7, 7).with_palette(0x3000, Psm::Psmct32);

    let err = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap_err();
    assert!(matches!(
        err,
        CacheError::AllocationFailure {
            width: 256,
            height: 1,
            ..
        }
    ));
    assert!(cache.textures().is_empty());
    assert_eq!(cache.device().live_count(), 0);
    assert_eq!(cache.device().pooled_count(), 1);
}

#[test]
fn test_max_texture_size_clamps_extent() {
    let memory = LinearMemory::new();
    let mut cache = cache_with(CacheConfig {
        max_texture_size: 256,
        ..Default::default()
    });
    let tex0 = MemoryDescriptor::texture(0, 16, Psm::Psmct32, 10, 10);
    let id = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();
    assert_eq!(cache.texture(id).unwrap().extent(), Rect::with_size(256, 256));
}

#[test]
fn test_failed_refetch_keeps_texture_dirty() {
    let mut memory = LinearMemory::new();
    let mut cache = flaky_cache();
    let tex0 = ct32_texture(0x1000);
    let request = TextureRequest::new(tex0);
    let id = cache.get_texture(&memory, &request).unwrap();

    let rect = Rect::with_size(16, 16);
    fill(&mut memory, &tex0, &rect, [5, 5, 5, 5]);
    cache.invalidate_for_cpu_write(&BitBltBuf::both(0x1000, 4, Psm::Psmct32), &rect);

    cache.device_mut().fail_after = Some(0);
    assert!(cache.get_texture(&memory, &request).is_err());
    let t = cache.texture(id).unwrap();
    assert_eq!(t.surface().dirty().len(), 1);
    assert_eq!(t.valid_region(), Rect::with_size(256, 256));

    assert_eq!(cache.get_texture(&memory, &request).unwrap(), id);
    let t = cache.texture(id).unwrap();
    assert!(!t.surface().is_dirty());
    let data = cache.device().inner.data(t.surface().texture()).unwrap();
    assert_eq!(&data[0..4], &[5, 5, 5, 5]);
}
