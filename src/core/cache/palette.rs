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

//! Palette snapshot with lazy GPU upload
//!
//! Games rewrite palettes far more often than index data, so the cache keeps
//! a byte snapshot of each palette it uploaded and only touches the GPU when
//! a fresh read from local memory differs from it.

use crate::core::device::{Device, SurfaceKind, TextureFormat, TextureHandle};
use crate::core::error::{CacheError, Result};
use crate::core::geometry::Rect;
use crate::core::memory::{Clut, CLUT_ENTRIES};

/// CLUT snapshot plus its optional GPU copy
#[derive(Debug, Clone)]
pub struct Palette {
    clut: Clut,
    entries: usize,
    texture: Option<TextureHandle>,
    dirty: bool,
}

impl Palette {
    /// Empty snapshot covering the first `entries` colors
    pub fn new(entries: usize) -> Self {
        Self {
            clut: [0; CLUT_ENTRIES],
            entries: entries.min(CLUT_ENTRIES),
            texture: None,
            dirty: true,
        }
    }

    /// Snapshot initialized from `clut`
    pub fn from_clut(entries: usize, clut: &Clut) -> Self {
        let mut palette = Self::new(entries);
        palette.refresh(clut);
        palette.dirty = true;
        palette
    }

    fn bytes(clut: &Clut, entries: usize) -> &[u8] {
        bytemuck::cast_slice(&clut[..entries])
    }

    /// Byte-for-byte comparison over the used entries
    pub fn matches(&self, clut: &Clut) -> bool {
        Self::bytes(&self.clut, self.entries) == Self::bytes(clut, self.entries)
    }

    /// Adopt `clut` if it differs from the snapshot
    ///
    /// Returns `true` when the snapshot changed; the GPU copy is then stale
    /// until the next [`Palette::sync`].
    pub fn refresh(&mut self, clut: &Clut) -> bool {
        if self.matches(clut) {
            return false;
        }
        self.clut[..self.entries].copy_from_slice(&clut[..self.entries]);
        self.dirty = true;
        true
    }

    /// Whether the GPU copy lags behind the snapshot
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn clut(&self) -> &Clut {
        &self.clut
    }

    /// GPU palette texture, once synced
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Make the GPU copy current, allocating it on first use
    ///
    /// Returns `true` when an upload happened.
    pub fn sync(&mut self, device: &mut dyn Device) -> Result<bool> {
        let texture = match self.texture {
            Some(texture) => texture,
            None => {
                let texture = device
                    .create_texture(self.entries as u32, 1, TextureFormat::Rgba8)
                    .ok_or(CacheError::AllocationFailure {
                        kind: SurfaceKind::Texture,
                        width: self.entries as u32,
                        height: 1,
                    })?;
                self.texture = Some(texture);
                self.dirty = true;
                texture
            }
        };

        if !self.dirty {
            return Ok(false);
        }

        let bytes = Self::bytes(&self.clut, self.entries);
        device.update_texture(
            texture,
            &Rect::with_size(self.entries as u32, 1),
            bytes,
            bytes.len(),
        )?;
        self.dirty = false;
        Ok(true)
    }

    /// Hand the GPU copy back to the device
    pub fn release(&mut self, device: &mut dyn Device) {
        if let Some(texture) = self.texture.take() {
            device.recycle(texture);
        }
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::HeadlessDevice;

    fn clut_with(index: usize, color: u32) -> Clut {
        let mut clut = [0; CLUT_ENTRIES];
        clut[index] = color;
        clut
    }

    #[test]
    fn test_refresh_only_on_change() {
        let mut palette = Palette::new(16);
        assert!(!palette.refresh(&[0; CLUT_ENTRIES]));
        assert!(palette.refresh(&clut_with(3, 0xFF00FF00)));
        assert!(!palette.refresh(&clut_with(3, 0xFF00FF00)));
    }

    #[test]
    fn test_unused_entries_are_ignored() {
        let palette = Palette::new(16);
        assert!(palette.matches(&clut_with(200, 0x12345678)));
        assert!(!palette.matches(&clut_with(15, 0x12345678)));
    }

    #[test]
    fn test_sync_uploads_once_per_change() {
        let mut device = HeadlessDevice::new();
        let mut palette = Palette::from_clut(256, &clut_with(1, 7));

        assert!(palette.sync(&mut device).unwrap());
        assert!(!palette.sync(&mut device).unwrap());
        assert_eq!(device.upload_count(), 1);

        palette.refresh(&clut_with(1, 8));
        assert!(palette.sync(&mut device).unwrap());
        assert_eq!(device.upload_count(), 2);
        assert_eq!(device.created_count(), 1);

        let texture = palette.texture().unwrap();
        assert_eq!(&device.data(texture).unwrap()[4..8], &8u32.to_le_bytes());

        palette.release(&mut device);
        assert_eq!(device.live_count(), 0);
    }
}
