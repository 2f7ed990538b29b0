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

//! Pixel storage modes
//!
//! The GS stores every buffer in local memory using one of thirteen pixel
//! storage modes (PSM). Each mode determines:
//! - Bits per pixel and the page geometry (pixels per 8 KiB page)
//! - Which bits of a 32-bit memory word it actually touches
//! - Whether texels are palette indices
//!
//! # Bit masks
//!
//! Several modes only use part of each 32-bit word. PSMCT24 leaves the top
//! byte alone, while PSMT8H/PSMT4HL/PSMT4HH live entirely in that top byte.
//! Two modes "share bits" when their masks intersect:
//!
//! | PSM            | Mask         |
//! |----------------|--------------|
//! | CT24, Z24      | `0x00FFFFFF` |
//! | T8H            | `0xFF000000` |
//! | T4HL           | `0x0F000000` |
//! | T4HH           | `0xF0000000` |
//! | everything else| `0xFFFFFFFF` |

use serde::{Deserialize, Serialize};

/// GS pixel storage mode (register value in the low 6 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Psm {
    Psmct32,
    Psmct24,
    Psmct16,
    Psmct16s,
    Psmt8,
    Psmt4,
    Psmt8h,
    Psmt4hl,
    Psmt4hh,
    Psmz32,
    Psmz24,
    Psmz16,
    Psmz16s,
}

/// Swizzle family of a pixel storage mode
///
/// Modes in the same family address pixel `(x, y)` through the same bytes,
/// so a rectangle written through one is the same rectangle in the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Color32,
    Color16,
    Color16S,
    Index8,
    Index4,
    Depth32,
    Depth16,
    Depth16S,
}

impl Psm {
    /// Decode the 6-bit register field
    ///
    /// # Example
    ///
    /// ```
    /// use gsrx::core::gs::Psm;
    ///
    /// assert_eq!(Psm::from_bits(0x13), Some(Psm::Psmt8));
    /// assert_eq!(Psm::from_bits(0x3F), None);
    /// ```
    pub fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits & 0x3F {
            0x00 => Psm::Psmct32,
            0x01 => Psm::Psmct24,
            0x02 => Psm::Psmct16,
            0x0A => Psm::Psmct16s,
            0x13 => Psm::Psmt8,
            0x14 => Psm::Psmt4,
            0x1B => Psm::Psmt8h,
            0x24 => Psm::Psmt4hl,
            0x2C => Psm::Psmt4hh,
            0x30 => Psm::Psmz32,
            0x31 => Psm::Psmz24,
            0x32 => Psm::Psmz16,
            0x3A => Psm::Psmz16s,
            _ => return None,
        })
    }

    pub fn bits(self) -> u32 {
        match self {
            Psm::Psmct32 => 0x00,
            Psm::Psmct24 => 0x01,
            Psm::Psmct16 => 0x02,
            Psm::Psmct16s => 0x0A,
            Psm::Psmt8 => 0x13,
            Psm::Psmt4 => 0x14,
            Psm::Psmt8h => 0x1B,
            Psm::Psmt4hl => 0x24,
            Psm::Psmt4hh => 0x2C,
            Psm::Psmz32 => 0x30,
            Psm::Psmz24 => 0x31,
            Psm::Psmz16 => 0x32,
            Psm::Psmz16s => 0x3A,
        }
    }

    pub fn layout(self) -> Layout {
        match self {
            Psm::Psmct32 | Psm::Psmct24 | Psm::Psmt8h | Psm::Psmt4hl | Psm::Psmt4hh => {
                Layout::Color32
            }
            Psm::Psmct16 => Layout::Color16,
            Psm::Psmct16s => Layout::Color16S,
            Psm::Psmt8 => Layout::Index8,
            Psm::Psmt4 => Layout::Index4,
            Psm::Psmz32 | Psm::Psmz24 => Layout::Depth32,
            Psm::Psmz16 => Layout::Depth16,
            Psm::Psmz16s => Layout::Depth16S,
        }
    }

    /// Storage bits per pixel
    pub fn bpp(self) -> u32 {
        match self.layout() {
            Layout::Color32 | Layout::Depth32 => 32,
            Layout::Color16 | Layout::Color16S | Layout::Depth16 | Layout::Depth16S => 16,
            Layout::Index8 => 8,
            Layout::Index4 => 4,
        }
    }

    /// Page dimensions in pixels (one page is 8 KiB / 32 blocks)
    pub fn page_size(self) -> (u32, u32) {
        match self.layout() {
            Layout::Color32 | Layout::Depth32 => (64, 32),
            Layout::Color16 | Layout::Color16S | Layout::Depth16 | Layout::Depth16S => (64, 64),
            Layout::Index8 => (128, 64),
            Layout::Index4 => (128, 128),
        }
    }

    /// Bits of each 32-bit memory word this mode reads and writes
    pub fn mask(self) -> u32 {
        match self {
            Psm::Psmct24 | Psm::Psmz24 => 0x00FF_FFFF,
            Psm::Psmt8h => 0xFF00_0000,
            Psm::Psmt4hl => 0x0F00_0000,
            Psm::Psmt4hh => 0xF000_0000,
            _ => 0xFFFF_FFFF,
        }
    }

    /// Number of palette entries for indexed modes (0 for direct color)
    pub fn palette_entries(self) -> usize {
        match self {
            Psm::Psmt8 | Psm::Psmt8h => 256,
            Psm::Psmt4 | Psm::Psmt4hl | Psm::Psmt4hh => 16,
            _ => 0,
        }
    }

    pub fn is_indexed(self) -> bool {
        self.palette_entries() != 0
    }

    /// Whether a write through `self` can be observed through `other`
    ///
    /// Symmetric by construction: the bit masks are intersected.
    pub fn shares_bits(self, other: Psm) -> bool {
        self.mask() & other.mask() != 0
    }

    /// Whether pixel rectangles translate one-to-one between the two modes
    pub fn is_compatible(self, other: Psm) -> bool {
        self.layout() == other.layout()
    }
}
