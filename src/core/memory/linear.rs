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

//! Page-addressed local memory without block swizzling
//!
//! Pages are placed row-major exactly like on hardware, but texels inside a
//! page are stored linearly instead of in the GS block/column order. Aliasing
//! between modes of the same swizzle family (and between any modes at page
//! granularity) therefore behaves like the real memory, which is all the
//! surface cache depends on.

use super::{Clut, LocalMemory, CLUT_ENTRIES};
use crate::core::geometry::Rect;
use crate::core::gs::{Layout, MemoryDescriptor, Psm, BLOCKS_PER_PAGE, MEMORY_BLOCKS};

/// Block size in bytes
const BLOCK_BYTES: usize = 256;

/// Page size in bytes
const PAGE_BYTES: usize = BLOCK_BYTES * BLOCKS_PER_PAGE as usize;

/// Texel location inside local memory
#[derive(Debug, Clone, Copy)]
struct Location {
    /// Byte offset of the containing storage unit
    offset: usize,
    /// Bit shift of the texel inside its unit (nibble and high-byte modes)
    shift: u32,
}

/// 4 MiB of GS local memory
pub struct LinearMemory {
    vram: Vec<u8>,
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMemory {
    /// Total size in bytes
    pub const SIZE: usize = MEMORY_BLOCKS as usize * BLOCK_BYTES;

    pub fn new() -> Self {
        Self {
            vram: vec![0; Self::SIZE],
        }
    }

    /// Raw memory contents
    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    fn locate(desc: &MemoryDescriptor, x: u32, y: u32) -> Location {
        let (pw, ph) = desc.psm.page_size();
        let page = (y / ph) * desc.pages_per_row() + x / pw;
        let texel = ((y % ph) * pw + x % pw) as usize;
        let base = desc.bp as usize * BLOCK_BYTES + page as usize * PAGE_BYTES;

        let (offset, shift) = match desc.psm {
            Psm::Psmt8h => (base + texel * 4, 24),
            Psm::Psmt4hl => (base + texel * 4, 24),
            Psm::Psmt4hh => (base + texel * 4, 28),
            Psm::Psmt4 => (base + texel / 2, (texel as u32 & 1) * 4),
            _ => (base + texel * desc.psm.bpp() as usize / 8, 0),
        };

        Location {
            offset: offset % Self::SIZE,
            shift,
        }
    }

    fn read32(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        for (i, byte) in word.iter_mut().enumerate() {
            *byte = self.vram[(offset + i) % Self::SIZE];
        }
        u32::from_le_bytes(word)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.vram[(offset + i) % Self::SIZE] = *byte;
        }
    }

    /// Read the raw storage value of one texel
    pub fn read_texel(&self, desc: &MemoryDescriptor, x: u32, y: u32) -> u32 {
        let loc = Self::locate(desc, x, y);
        match desc.psm.layout() {
            Layout::Color32 | Layout::Depth32 => {
                (self.read32(loc.offset) & desc.psm.mask()) >> loc.shift
            }
            Layout::Color16 | Layout::Color16S | Layout::Depth16 | Layout::Depth16S => {
                self.read32(loc.offset) & 0xFFFF
            }
            Layout::Index8 => self.vram[loc.offset] as u32,
            Layout::Index4 => (self.vram[loc.offset] as u32 >> loc.shift) & 0xF,
        }
    }

    /// Write the raw storage value of one texel, leaving unmasked bits intact
    pub fn write_texel(&mut self, desc: &MemoryDescriptor, x: u32, y: u32, value: u32) {
        let loc = Self::locate(desc, x, y);
        match desc.psm.layout() {
            Layout::Color32 | Layout::Depth32 => {
                let mask = desc.psm.mask();
                let old = self.read32(loc.offset);
                self.write32(loc.offset, (old & !mask) | ((value << loc.shift) & mask));
            }
            Layout::Color16 | Layout::Color16S | Layout::Depth16 | Layout::Depth16S => {
                let [lo, hi, ..] = value.to_le_bytes();
                self.vram[loc.offset] = lo;
                self.vram[(loc.offset + 1) % Self::SIZE] = hi;
            }
            Layout::Index8 => self.vram[loc.offset] = value as u8,
            Layout::Index4 => {
                let byte = &mut self.vram[loc.offset];
                *byte = (*byte & !(0xF << loc.shift)) | (((value & 0xF) as u8) << loc.shift);
            }
        }
    }
}

/// Expand a storage value into an RGBA8 host pixel
fn to_host(psm: Psm, value: u32) -> [u8; 4] {
    match psm {
        Psm::Psmct24 => {
            let [r, g, b, _] = value.to_le_bytes();
            [r, g, b, 0x80]
        }
        Psm::Psmct16 | Psm::Psmct16s => {
            let expand = |c: u32| ((c & 0x1F) << 3) as u8;
            [
                expand(value),
                expand(value >> 5),
                expand(value >> 10),
                if value & 0x8000 != 0 { 0x80 } else { 0 },
            ]
        }
        _ => value.to_le_bytes(),
    }
}

/// Pack an RGBA8 host pixel into a storage value
fn from_host(psm: Psm, pixel: [u8; 4]) -> u32 {
    match psm {
        Psm::Psmct16 | Psm::Psmct16s => {
            let [r, g, b, a] = pixel.map(|c| c as u32);
            (r >> 3) | ((g >> 3) << 5) | ((b >> 3) << 10) | if a & 0x80 != 0 { 0x8000 } else { 0 }
        }
        _ => u32::from_le_bytes(pixel),
    }
}

impl LocalMemory for LinearMemory {
    fn read(&self, desc: &MemoryDescriptor, rect: &Rect, palette: Option<&Clut>) -> Vec<u8> {
        let indexed = desc.psm.is_indexed();
        let bpp = super::host_bytes_per_pixel(desc, palette.is_some());
        let mut out = Vec::with_capacity(rect.area() as usize * bpp);

        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                let value = self.read_texel(desc, x.max(0) as u32, y.max(0) as u32);
                match (indexed, palette) {
                    (true, Some(clut)) => {
                        out.extend_from_slice(&clut[value as usize % CLUT_ENTRIES].to_le_bytes())
                    }
                    (true, None) => out.push(value as u8),
                    (false, _) => out.extend_from_slice(&to_host(desc.psm, value)),
                }
            }
        }

        out
    }

    fn read_palette(&self, desc: &MemoryDescriptor) -> Clut {
        let mut clut = [0u32; CLUT_ENTRIES];
        let entries = desc.psm.palette_entries();
        let source = MemoryDescriptor::buffer(desc.cbp, 1, desc.cpsm);

        for (i, entry) in clut.iter_mut().take(entries).enumerate() {
            let value = self.read_texel(&source, i as u32 % 16, i as u32 / 16);
            *entry = u32::from_le_bytes(to_host(desc.cpsm, value));
        }

        clut
    }

    fn write(&mut self, desc: &MemoryDescriptor, rect: &Rect, data: &[u8]) {
        let bpp = super::host_bytes_per_pixel(desc, false);
        let mut pixels = data.chunks_exact(bpp);

        for y in rect.top.max(0)..rect.bottom {
            for x in rect.left.max(0)..rect.right {
                let Some(chunk) = pixels.next() else {
                    return;
                };
                let value = if bpp == 1 {
                    chunk[0] as u32
                } else {
                    from_host(desc.psm, [chunk[0], chunk[1], chunk[2], chunk[3]])
                };
                self.write_texel(desc, x as u32, y as u32, value);
            }
        }
    }
}
