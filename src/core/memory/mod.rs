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

//! GS local memory interface
//!
//! The surface cache reads texels and palettes from emulated local memory
//! and writes resolved render targets back into it. All transfers use a host
//! pixel representation so the cache never deals with swizzling:
//!
//! | Mode                         | Host pixel                    |
//! |------------------------------|-------------------------------|
//! | Direct color (CT32/24/16/16S)| 4 bytes, R G B A              |
//! | Depth (Z32/24/16/16S)        | 4 bytes, little-endian depth  |
//! | Indexed, no palette given    | 1 byte, palette index         |
//! | Indexed, palette given       | 4 bytes, palette color        |
//!
//! # Example
//!
//! ```
//! use gsrx::core::geometry::Rect;
//! use gsrx::core::gs::{MemoryDescriptor, Psm};
//! use gsrx::core::memory::{LinearMemory, LocalMemory};
//!
//! let mut mem = LinearMemory::new();
//! let fb = MemoryDescriptor::buffer(0, 1, Psm::Psmct32);
//! let rect = Rect::with_size(1, 1);
//!
//! mem.write(&fb, &rect, &[1, 2, 3, 4]);
//! assert_eq!(mem.read(&fb, &rect, None), vec![1, 2, 3, 4]);
//! ```

mod linear;

pub use linear::LinearMemory;

use super::geometry::Rect;
use super::gs::MemoryDescriptor;

/// Number of entries in a palette snapshot
pub const CLUT_ENTRIES: usize = 256;

/// Palette snapshot: up to 256 RGBA colors packed little-endian
pub type Clut = [u32; CLUT_ENTRIES];

/// Emulated GS local memory collaborator
pub trait LocalMemory {
    /// Read `rect` of the buffer described by `desc` as tightly packed host pixels
    ///
    /// When `palette` is given, indexed modes are expanded through it.
    fn read(&self, desc: &MemoryDescriptor, rect: &Rect, palette: Option<&Clut>) -> Vec<u8>;

    /// Read the palette referenced by `desc.cbp`/`desc.cpsm`
    ///
    /// Entries past the mode's palette size are zero.
    fn read_palette(&self, desc: &MemoryDescriptor) -> Clut;

    /// Store tightly packed host pixels into `rect` of the buffer described by `desc`
    fn write(&mut self, desc: &MemoryDescriptor, rect: &Rect, data: &[u8]);
}

/// Bytes per host pixel for a read through `desc`
pub fn host_bytes_per_pixel(desc: &MemoryDescriptor, expanded: bool) -> usize {
    if desc.psm.is_indexed() && !expanded {
        1
    } else {
        4
    }
}
