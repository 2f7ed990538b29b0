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

//! gsrx: A PlayStation 2 Graphics Synthesizer surface cache
//!
//! Hardware renderers for the GS keep copies of local memory on the host
//! GPU as render targets, depth-stencils and textures. This crate decides
//! when those copies can be reused, when they must be refreshed from memory
//! and when they must be written back.
//!
//! # Architecture
//!
//! - [`core`]: Cache, GS vocabulary and collaborator interfaces
//! - [`replay`]: JSON trace format and driver for the `gsrx-replay` tool
//!
//! # Example
//!
//! ```
//! use gsrx::core::cache::{CacheConfig, SurfaceCache, TargetLookup, TargetRequest};
//! use gsrx::core::device::HeadlessDevice;
//! use gsrx::core::gs::{MemoryDescriptor, Psm};
//! use gsrx::core::memory::LinearMemory;
//!
//! let memory = LinearMemory::new();
//! let mut cache = SurfaceCache::new(HeadlessDevice::new(), CacheConfig::default());
//!
//! let frame = MemoryDescriptor::buffer(0, 10, Psm::Psmct32);
//! let request = TargetRequest::new(frame, 640, 448);
//! let rt = cache.get_render_target(&memory, &request, TargetLookup::Draw)?;
//! assert!(cache.render_target(rt).is_some());
//!
//! cache.tick();
//! # Ok::<(), gsrx::CacheError>(())
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`core::error::Result<T>`], an alias for
//! `Result<T, CacheError>`. Allocation failures are the only errors a
//! renderer normally sees; it should skip or degrade the draw.

pub mod core;
pub mod replay;

// Re-export commonly used types
pub use core::error::{CacheError, Result};
