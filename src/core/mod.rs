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

//! Core surface cache components
//!
//! - [`gs`]: GS memory vocabulary (pixel modes, descriptors, transfers, clamping)
//! - [`geometry`]: Rectangle algebra and device scaling
//! - [`device`]: Graphics backend interface and a headless backend
//! - [`memory`]: Local memory interface and a linear store
//! - [`cache`]: The surface cache itself
//! - [`error`]: Error types

pub mod cache;
pub mod device;
pub mod error;
pub mod geometry;
pub mod gs;
pub mod memory;
