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

//! Graphics Synthesizer memory vocabulary
//!
//! The GS has 4 MiB of local memory addressed in 256-byte blocks. Every
//! buffer the GS touches is described by a base block pointer, a buffer width
//! and a pixel storage mode. The same triple appears in several registers:
//!
//! - `TEX0`: the texture being sampled (plus log2 size and palette location)
//! - `FRAME`: the color buffer being drawn
//! - `ZBUF`: the depth buffer being drawn
//! - `BITBLTBUF`: source and destination of a host/local transfer
//!
//! # Addressing
//!
//! Memory is organized in pages of 32 blocks (8 KiB). Pages of a buffer are
//! laid out row-major, `bw * 64 / page_width` pages per row, so moving the
//! base pointer by a whole number of pages shifts the buffer by a whole
//! number of page columns and rows.
//!
//! # References
//!
//! - GS User's Manual, section 3 (local memory) and section 7 (registers)

mod psm;

pub use psm::{Layout, Psm};

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Blocks per 8 KiB page
pub const BLOCKS_PER_PAGE: u32 = 32;

/// Total addressable blocks in GS local memory (4 MiB / 256 bytes)
pub const MEMORY_BLOCKS: u32 = 0x4000;

/// Largest texture side the GS can address (TW/TH of 10)
pub const MAX_TEXTURE_LOG2: u8 = 10;

/// Layout of one buffer in GS local memory
///
/// Equivalent to the TEX0 register; FRAME and ZBUF descriptors leave the
/// texture-only fields at their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryDescriptor {
    /// Base block pointer (256-byte units)
    pub bp: u32,

    /// Buffer width in 64-pixel units
    pub bw: u32,

    /// Pixel storage mode
    pub psm: Psm,

    /// log2 of the texture width
    #[serde(default)]
    pub tw: u8,

    /// log2 of the texture height
    #[serde(default)]
    pub th: u8,

    /// Palette base block pointer
    #[serde(default)]
    pub cbp: u32,

    /// Palette storage mode
    #[serde(default = "default_cpsm")]
    pub cpsm: Psm,
}

fn default_cpsm() -> Psm {
    Psm::Psmct32
}

impl MemoryDescriptor {
    /// Describe a texture (TEX0)
    ///
    /// # Example
    ///
    /// ```
    /// use gsrx::core::gs::{MemoryDescriptor, Psm};
    ///
    /// let tex0 = MemoryDescriptor::texture(0x1000, 4, Psm::Psmct32, 8, 8);
    /// assert_eq!(tex0.extent().width(), 256);
    /// ```
    pub fn texture(bp: u32, bw: u32, psm: Psm, tw: u8, th: u8) -> Self {
        Self {
            bp,
            bw,
            psm,
            tw: tw.min(MAX_TEXTURE_LOG2),
            th: th.min(MAX_TEXTURE_LOG2),
            cbp: 0,
            cpsm: Psm::Psmct32,
        }
    }

    /// Describe a color or depth buffer (FRAME/ZBUF)
    pub fn buffer(bp: u32, bw: u32, psm: Psm) -> Self {
        Self::texture(bp, bw, psm, 0, 0)
    }

    /// Attach a palette location (CBP/CPSM)
    pub fn with_palette(mut self, cbp: u32, cpsm: Psm) -> Self {
        self.cbp = cbp;
        self.cpsm = cpsm;
        self
    }

    /// Buffer width in pixels
    pub fn width_px(&self) -> u32 {
        self.bw * 64
    }

    pub fn pages_per_row(&self) -> u32 {
        let (pw, _) = self.psm.page_size();
        (self.width_px() / pw).max(1)
    }

    /// Full addressable texture rectangle (`1 << tw` by `1 << th`)
    pub fn extent(&self) -> Rect {
        Rect::with_size(
            1 << self.tw.min(MAX_TEXTURE_LOG2),
            1 << self.th.min(MAX_TEXTURE_LOG2),
        )
    }

    /// Aliasing predicate: a write through one descriptor is visible through the other
    ///
    /// Both descriptors must start at the same block and their pixel modes
    /// must touch overlapping bits of each memory word. Symmetric.
    pub fn shares_bits(&self, other: &MemoryDescriptor) -> bool {
        self.bp == other.bp && self.psm.shares_bits(other.psm)
    }

    /// Same base, width and swizzle family: rectangles map one-to-one
    pub fn is_compatible(&self, other: &MemoryDescriptor) -> bool {
        self.bp == other.bp && self.bw == other.bw && self.psm.is_compatible(other.psm)
    }

    /// Pixels in one page row; columns past it wrap onto the next row
    pub fn row_width_px(&self) -> u32 {
        let (pw, _) = self.psm.page_size();
        self.pages_per_row() * pw
    }

    /// Blocks touched by `rect` of this buffer, rounded out to whole page rows
    ///
    /// A rectangle wider than a page row spills into the following rows.
    pub fn span(&self, rect: &Rect) -> BlockSpan {
        if rect.is_empty() {
            return BlockSpan::EMPTY;
        }
        let (pw, ph) = self.psm.page_size();
        let ppr = self.pages_per_row();
        let first_row = rect.top.max(0) as u32 / ph;
        let last_row = (rect.bottom.max(1) as u32 - 1) / ph;
        let columns = (rect.right.max(1) as u32).div_ceil(pw).max(ppr);
        BlockSpan {
            start: self.bp + first_row * ppr * BLOCKS_PER_PAGE,
            end: self.bp + (last_row * ppr + columns) * BLOCKS_PER_PAGE,
        }
    }

    /// Row offset of `other`'s origin inside this buffer's layout
    ///
    /// Only defined when both buffers use the same swizzle family and width
    /// and their bases are a whole number of page rows apart. Negative when
    /// `other` starts earlier in memory than `self`.
    pub fn row_offset_of(&self, other: &MemoryDescriptor) -> Option<i32> {
        if self.bw != other.bw || !self.psm.is_compatible(other.psm) {
            return None;
        }
        let diff = other.bp as i64 - self.bp as i64;
        let row_blocks = (self.pages_per_row() * BLOCKS_PER_PAGE) as i64;
        if diff % row_blocks != 0 {
            return None;
        }
        let (_, ph) = self.psm.page_size();
        Some((diff / row_blocks * ph as i64) as i32)
    }
}

/// Half-open range of block addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: u32,
    pub end: u32,
}

impl BlockSpan {
    pub const EMPTY: BlockSpan = BlockSpan { start: 0, end: 0 };

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, other: &BlockSpan) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// Transfer buffer descriptor (BITBLTBUF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitBltBuf {
    /// Source base block pointer
    pub sbp: u32,
    /// Source buffer width (64-pixel units)
    pub sbw: u32,
    /// Source pixel storage mode
    pub spsm: Psm,
    /// Destination base block pointer
    pub dbp: u32,
    /// Destination buffer width (64-pixel units)
    pub dbw: u32,
    /// Destination pixel storage mode
    pub dpsm: Psm,
}

impl BitBltBuf {
    /// Transfer whose source and destination are the same buffer
    pub fn both(bp: u32, bw: u32, psm: Psm) -> Self {
        Self {
            sbp: bp,
            sbw: bw,
            spsm: psm,
            dbp: bp,
            dbw: bw,
            dpsm: psm,
        }
    }

    pub fn source(&self) -> MemoryDescriptor {
        MemoryDescriptor::buffer(self.sbp, self.sbw, self.spsm)
    }

    pub fn destination(&self) -> MemoryDescriptor {
        MemoryDescriptor::buffer(self.dbp, self.dbw, self.dpsm)
    }
}

/// Texture wrap mode for one axis (CLAMP.WMS / CLAMP.WMT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
    RegionClamp,
    RegionRepeat,
}

impl WrapMode {
    fn wraps(self) -> bool {
        matches!(self, WrapMode::Repeat | WrapMode::RegionRepeat)
    }
}

/// Texture addressing state (CLAMP register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Clamp {
    pub wms: WrapMode,
    pub wmt: WrapMode,
    #[serde(default)]
    pub minu: i32,
    #[serde(default)]
    pub maxu: i32,
    #[serde(default)]
    pub minv: i32,
    #[serde(default)]
    pub maxv: i32,
}

impl Clamp {
    pub fn new(wms: WrapMode, wmt: WrapMode) -> Self {
        Self {
            wms,
            wmt,
            ..Default::default()
        }
    }

    /// Texels reachable through this addressing state
    pub fn region(&self, extent: &Rect) -> Rect {
        let (left, right) = match self.wms {
            WrapMode::RegionClamp => (self.minu, self.maxu + 1),
            _ => (extent.left, extent.right),
        };
        let (top, bottom) = match self.wmt {
            WrapMode::RegionClamp => (self.minv, self.maxv + 1),
            _ => (extent.top, extent.bottom),
        };
        Rect::new(left, top, right, bottom).intersect(extent)
    }

    /// Texels actually read when the draw's UVs span `uv`
    ///
    /// Wrapping axes whose UVs leave the texture touch the full extent.
    pub fn sample_rect(&self, extent: &Rect, uv: Option<&Rect>) -> Rect {
        let Some(uv) = uv else {
            return self.region(extent);
        };
        let region = self.region(extent);
        let (left, right) = if self.wms.wraps() && (uv.left < extent.left || uv.right > extent.right)
        {
            (region.left, region.right)
        } else {
            (uv.left.max(region.left), uv.right.min(region.right))
        };
        let (top, bottom) = if self.wmt.wraps() && (uv.top < extent.top || uv.bottom > extent.bottom)
        {
            (region.top, region.bottom)
        } else {
            (uv.top.max(region.top), uv.bottom.min(region.bottom))
        };
        Rect::new(left, top, right, bottom).intersect(&region)
    }

    /// Whether a texture fetched under `self` may serve a draw using `other`
    ///
    /// Different modes are only interchangeable when the draw never leaves
    /// either clamp rectangle, so wrapping cannot change a single texel.
    pub fn interchangeable(&self, other: &Clamp, extent: &Rect, uv: Option<&Rect>) -> bool {
        if self == other {
            return true;
        }
        let sampled = uv.copied().unwrap_or(*extent);
        self.region(extent).contains(&sampled) && other.region(extent).contains(&sampled)
    }
}

#[cfg(test)]
mod tests;
