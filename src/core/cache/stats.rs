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

//! Cache counters

use serde::Serialize;

/// Why a surface left the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// Unused for longer than its pool allows
    Age,
    /// Overwritten by the rasterizer
    GpuWrite,
    /// Overwritten by a transfer that cannot be tracked as a rectangle
    CpuWrite,
    /// The render target or depth-stencil it viewed went away or changed
    SourceReused,
    /// A fresh upload with the same descriptor took its place
    Replaced,
    /// Full cache flush
    Flush,
}

/// Eviction counts by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionStats {
    pub age: u64,
    pub gpu_write: u64,
    pub cpu_write: u64,
    pub source_reused: u64,
    pub replaced: u64,
    pub flush: u64,
}

impl EvictionStats {
    pub fn total(&self) -> u64 {
        self.age + self.gpu_write + self.cpu_write + self.source_reused + self.replaced + self.flush
    }
}

/// Per-pool lookup counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Running counters kept by the surface cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub render_targets: LookupStats,
    pub depth_stencils: LookupStats,
    pub textures: LookupStats,

    /// Frame-buffer lookups served by a nearby render target
    pub alias_hits: u64,

    /// Textures created as views over render targets or depth-stencils
    pub views: u64,

    /// Uploads from local memory (textures, palettes and refreshes)
    pub uploads: u64,

    /// Texels read from local memory for uploads
    pub uploaded_texels: u64,

    /// Lookups that found nothing to fetch
    pub clean_hits: u64,

    /// Dirty rectangles queued by CPU writes
    pub dirty_rects: u64,

    /// Render targets written back to local memory
    pub resolves: u64,

    pub allocation_failures: u64,

    pub evictions: EvictionStats,
}

impl CacheStats {
    pub(crate) fn record_eviction(&mut self, reason: EvictReason) {
        let counter = match reason {
            EvictReason::Age => &mut self.evictions.age,
            EvictReason::GpuWrite => &mut self.evictions.gpu_write,
            EvictReason::CpuWrite => &mut self.evictions.cpu_write,
            EvictReason::SourceReused => &mut self.evictions.source_reused,
            EvictReason::Replaced => &mut self.evictions.replaced,
            EvictReason::Flush => &mut self.evictions.flush,
        };
        *counter += 1;
    }

    pub(crate) fn record_upload(&mut self, texels: i64) {
        self.uploads += 1;
        self.uploaded_texels += texels.max(0) as u64;
    }
}
