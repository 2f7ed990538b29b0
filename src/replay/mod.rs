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

//! Surface cache trace replay
//!
//! A trace is a JSON array of cache operations, each tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "render_target", "descriptor": { "bp": 0, "bw": 10, "psm": "PSMCT32" },
//!     "width": 640, "height": 448 },
//!   { "op": "cpu_write", "bitbltbuf": { "sbp": 0, "sbw": 10, "spsm": "PSMCT32",
//!     "dbp": 0, "dbw": 10, "dpsm": "PSMCT32" },
//!     "rect": { "left": 0, "top": 0, "right": 64, "bottom": 32 }, "fill": [255, 0, 0, 255] },
//!   { "op": "tick", "count": 3 }
//! ]
//! ```
//!
//! [`Replay`] drives a [`SurfaceCache`] and a [`LinearMemory`] through the
//! operations. Allocation failures are counted and the replay continues, the
//! same way a renderer skips a draw it cannot allocate for.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::core::cache::{
    CacheConfig, CacheStats, SurfaceCache, TargetLookup, TargetRequest, TextureRequest,
};
use crate::core::device::Device;
use crate::core::error::{CacheError, Result};
use crate::core::geometry::Rect;
use crate::core::gs::{BitBltBuf, MemoryDescriptor};
use crate::core::memory::{host_bytes_per_pixel, LinearMemory, LocalMemory};

/// One recorded cache operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    RenderTarget {
        descriptor: MemoryDescriptor,
        width: u32,
        height: u32,
        #[serde(default)]
        logical_height: Option<u32>,
        #[serde(default)]
        lookup: TargetLookup,
    },
    DepthStencil {
        descriptor: MemoryDescriptor,
        width: u32,
        height: u32,
        #[serde(default)]
        logical_height: Option<u32>,
        #[serde(default)]
        depth_write: bool,
    },
    Texture(TextureRequest),
    GpuWrite {
        descriptor: MemoryDescriptor,
        rect: Rect,
    },
    /// Host transfer; `fill` stores one RGBA color (or index in its first byte)
    /// over `rect` before the cache is told about the write
    CpuWrite {
        bitbltbuf: BitBltBuf,
        rect: Rect,
        #[serde(default)]
        fill: Option<[u8; 4]>,
    },
    CpuRead {
        bitbltbuf: BitBltBuf,
        rect: Rect,
    },
    Tick {
        #[serde(default = "default_ticks")]
        count: u32,
    },
    RemoveAll,
}

fn default_ticks() -> u32 {
    1
}

fn target_request(
    descriptor: MemoryDescriptor,
    width: u32,
    height: u32,
    logical_height: Option<u32>,
) -> TargetRequest {
    let request = TargetRequest::new(descriptor, width, height);
    match logical_height {
        Some(rows) => request.with_logical_height(rows),
        None => request,
    }
}

/// Parsed replay trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    pub ops: Vec<TraceOp>,
}

impl Trace {
    /// Load a trace from a JSON file
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CacheError::Trace(format!("failed to read {}: {}", path, e)))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::Trace(format!("invalid trace: {}", e)))
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Operations applied
    pub ops: usize,

    /// Operations skipped because the device ran out of surfaces
    pub skipped: usize,

    /// Cached surfaces left at the end (render targets, depth-stencils, textures)
    pub render_targets: usize,
    pub depth_stencils: usize,
    pub textures: usize,

    pub stats: CacheStats,
}

/// Drives a surface cache over an emulated local memory
pub struct Replay<D: Device> {
    cache: SurfaceCache<D>,
    memory: LinearMemory,
    ops: usize,
    skipped: usize,
}

impl<D: Device> Replay<D> {
    pub fn new(device: D, config: CacheConfig) -> Self {
        Self {
            cache: SurfaceCache::new(device, config),
            memory: LinearMemory::new(),
            ops: 0,
            skipped: 0,
        }
    }

    pub fn cache(&self) -> &SurfaceCache<D> {
        &self.cache
    }

    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    /// Apply every operation of `trace` in order
    pub fn run(&mut self, trace: &Trace) -> Result<ReplaySummary> {
        for op in &trace.ops {
            self.apply(op)?;
        }
        Ok(self.summary())
    }

    /// Apply one operation
    ///
    /// Allocation failures are counted as skipped; other errors are returned.
    pub fn apply(&mut self, op: &TraceOp) -> Result<()> {
        self.ops += 1;
        match self.dispatch(op) {
            Err(CacheError::AllocationFailure { kind, width, height }) => {
                log::warn!("Skipped {:?} {}x{}: out of device memory", kind, width, height);
                self.skipped += 1;
                Ok(())
            }
            other => other,
        }
    }

    fn dispatch(&mut self, op: &TraceOp) -> Result<()> {
        let Self { cache, memory, .. } = self;
        match *op {
            TraceOp::RenderTarget {
                descriptor,
                width,
                height,
                logical_height,
                lookup,
            } => {
                let request = target_request(descriptor, width, height, logical_height);
                cache.get_render_target(&*memory, &request, lookup)?;
            }
            TraceOp::DepthStencil {
                descriptor,
                width,
                height,
                logical_height,
                depth_write,
            } => {
                let request = target_request(descriptor, width, height, logical_height);
                cache.get_depth_stencil(&*memory, &request, depth_write)?;
            }
            TraceOp::Texture(ref request) => {
                cache.get_texture(&*memory, request)?;
            }
            TraceOp::GpuWrite { descriptor, rect } => {
                cache.invalidate_for_gpu_write(&descriptor, &rect);
            }
            TraceOp::CpuWrite {
                bitbltbuf,
                rect,
                fill,
            } => {
                if let Some(color) = fill {
                    let dst = bitbltbuf.destination();
                    let bpp = host_bytes_per_pixel(&dst, false);
                    let pixels = rect.area().max(0) as usize;
                    let data: Vec<u8> = color[..bpp]
                        .iter()
                        .copied()
                        .cycle()
                        .take(pixels * bpp)
                        .collect();
                    memory.write(&dst, &rect, &data);
                }
                cache.invalidate_for_cpu_write(&bitbltbuf, &rect);
            }
            TraceOp::CpuRead { bitbltbuf, rect } => {
                cache.invalidate_for_cpu_read(memory, &bitbltbuf, &rect)?;
            }
            TraceOp::Tick { count } => {
                for _ in 0..count {
                    cache.tick();
                }
            }
            TraceOp::RemoveAll => cache.remove_all(),
        }
        Ok(())
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            ops: self.ops,
            skipped: self.skipped,
            render_targets: self.cache.render_targets().len(),
            depth_stencils: self.cache.depth_stencils().len(),
            textures: self.cache.textures().len(),
            stats: self.cache.stats().clone(),
        }
    }
}
