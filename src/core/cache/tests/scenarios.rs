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

//! End-to-end cache scenarios

use super::*;
use crate::core::cache::{TextureRequest, TextureSource};
use crate::core::gs::BitBltBuf;

/// A 4-bit upload over a drawn 32-bit target cannot be tracked as a
/// rectangle: the target and anything sampled from it must go, and the next
/// lookup uploads the whole texture from memory.
#[test]
fn test_indexed_write_over_render_target_forces_full_upload() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let rt = draw_target(&mut cache, &memory, MemoryDescriptor::buffer(0, 4, Psm::Psmct32), 256, 256);

    let request = TextureRequest::new(MemoryDescriptor::texture(0, 4, Psm::Psmct32, 8, 8));
    let view = cache.get_texture(&memory, &request).unwrap();
    assert_eq!(cache.texture(view).unwrap().source(), TextureSource::RenderTarget(rt));

    cache.invalidate_for_cpu_write(&BitBltBuf::both(0, 4, Psm::Psmt4), &Rect::with_size(64, 64));
    assert!(cache.texture(view).is_none());
    assert!(cache.render_target(rt).is_none());
    assert_eq!(cache.stats().dirty_rects, 0);

    let fresh = cache.get_texture(&memory, &request).unwrap();
    let texture = cache.texture(fresh).unwrap();
    assert_eq!(texture.source(), TextureSource::Memory);
    assert_eq!(texture.valid_region(), Rect::with_size(256, 256));
    assert_eq!(cache.stats().uploaded_texels, 256 * 256);
}

/// Same as above for a texture that was uploaded from memory
#[test]
fn test_indexed_write_over_uploaded_texture_evicts() {
    let memory = LinearMemory::new();
    let mut cache = cache();
    let request = TextureRequest::new(MemoryDescriptor::texture(0, 4, Psm::Psmct32, 8, 8));
    let id = cache.get_texture(&memory, &request).unwrap();

    cache.invalidate_for_cpu_write(&BitBltBuf::both(0, 4, Psm::Psmt4), &Rect::with_size(64, 64));
    assert!(cache.texture(id).is_none());

    let uploads = cache.stats().uploads;
    cache.get_texture(&memory, &request).unwrap();
    assert_eq!(cache.stats().uploads, uploads + 1);
}

/// Two small writes into a 16-bit 512x448 buffer leave a large valid band;
/// samples inside it never touch memory.
#[test]
fn test_partial_writes_keep_valid_band() {
    let memory = LinearMemory::new();
    let mut cache = cache();

    let tex0 = MemoryDescriptor::texture(0, 8, Psm::Psmct16, 9, 9);
    let id = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();
    draw_target(&mut cache, &memory, MemoryDescriptor::buffer(0, 8, Psm::Psmct16), 512, 448);

    let blit = BitBltBuf::both(0, 8, Psm::Psmct16);
    cache.invalidate_for_cpu_write(&blit, &Rect::new(0, 0, 100, 100));
    cache.invalidate_for_cpu_write(&blit, &Rect::new(200, 300, 300, 400));
    assert_eq!(cache.texture(id).unwrap().surface().dirty().len(), 2);

    let uploads = cache.device().upload_count();
    for uv in [Rect::new(150, 20, 200, 70), Rect::new(400, 200, 450, 250)] {
        let request = TextureRequest::new(tex0).with_uv(uv);
        assert_eq!(cache.get_texture(&memory, &request).unwrap(), id);
    }

    let texture = cache.texture(id).unwrap();
    assert!(!texture.surface().is_dirty());
    assert_eq!(texture.valid_region(), Rect::new(100, 0, 512, 300));
    assert_eq!(cache.device().upload_count(), uploads);
    assert_eq!(cache.stats().clean_hits, 2);
}

/// Sampling a written area after partial writes re-fetches it
#[test]
fn test_sampling_written_area_refetches() {
    let mut memory = LinearMemory::new();
    let mut cache = cache();
    let tex0 = MemoryDescriptor::texture(0x1000, 4, Psm::Psmct32, 8, 8);
    let id = cache.get_texture(&memory, &TextureRequest::new(tex0)).unwrap();

    let written = Rect::new(0, 0, 32, 32);
    fill(&mut memory, &tex0, &written, [5, 5, 5, 5]);
    cache.invalidate_for_cpu_write(&BitBltBuf::both(0x1000, 4, Psm::Psmct32), &written);

    let request = TextureRequest::new(tex0).with_uv(Rect::new(0, 0, 16, 16));
    assert_eq!(cache.get_texture(&memory, &request).unwrap(), id);

    let handle = cache.texture(id).unwrap().surface().texture();
    let data = cache.device().data(handle).unwrap();
    assert_eq!(&data[0..4], &[5, 5, 5, 5]);
    assert!(cache.texture(id).unwrap().valid_region().contains(&Rect::new(0, 0, 16, 16)));
}
