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

//! Valid-region reconciliation
//!
//! A memory-backed texture tracks one rectangle known to match local memory.
//! Before a draw samples it, pending CPU writes are folded in and the cache
//! decides what must be fetched again:
//!
//! 1. Each dirty rectangle is cut out of the valid region, keeping the
//!    largest of the four bands around it (left, top, right, bottom).
//! 2. If the valid region now covers the sampled rectangle, nothing is fetched.
//! 3. If the sampled rectangle sits inside the valid region's rows (or
//!    columns) and touches it, the valid region grows sideways and only the
//!    new strip is fetched.
//! 4. Otherwise the bounding box of both is fetched and becomes valid.
//!
//! Shrinking to the largest band trades a little valid area for avoiding a
//! full re-upload after every partial write.

use super::surface::DirtyRect;
use crate::core::geometry::Rect;

/// What must be read from local memory before sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// The valid region already covers the sampled rectangle
    Nothing,
    /// The valid region grew along one axis; only this strip is stale
    Extend(Rect),
    /// Everything in this rectangle must be re-fetched
    Union(Rect),
}

impl Fetch {
    /// Rectangle to read, if any
    pub fn rect(&self) -> Option<Rect> {
        match self {
            Fetch::Nothing => None,
            Fetch::Extend(r) | Fetch::Union(r) => Some(*r),
        }
    }
}

/// Largest rectangle of `valid` that excludes `hole`
pub fn exclude(valid: &Rect, hole: &Rect) -> Rect {
    let hole = valid.intersect(hole);
    if hole.is_empty() {
        return *valid;
    }
    valid
        .bands_around(&hole)
        .into_iter()
        .fold(Rect::EMPTY, |best, band| {
            if band.area() > best.area() {
                band
            } else {
                best
            }
        })
}

/// Fold `dirty` into `valid` and compute the fetch needed to sample `requested`
///
/// Consumes every dirty entry. On return `valid` includes `requested`
/// (provided the caller performs the returned fetch).
///
/// # Example
///
/// ```
/// use gsrx::core::cache::{compute_fetch_rect, Fetch};
/// use gsrx::core::geometry::Rect;
///
/// let mut valid = Rect::with_size(256, 256);
/// let mut dirty = Vec::new();
/// let fetch = compute_fetch_rect(&mut valid, &mut dirty, &Rect::new(10, 10, 20, 20));
/// assert_eq!(fetch, Fetch::Nothing);
/// ```
pub fn compute_fetch_rect(valid: &mut Rect, dirty: &mut Vec<DirtyRect>, requested: &Rect) -> Fetch {
    for d in dirty.drain(..) {
        *valid = exclude(valid, &d.rect);
    }

    if valid.contains(requested) {
        return Fetch::Nothing;
    }

    if valid.is_empty() {
        *valid = *requested;
        return Fetch::Union(*requested);
    }

    if let Some((grown, strip)) = extend_band(valid, requested) {
        *valid = grown;
        return Fetch::Extend(strip);
    }

    *valid = valid.union(requested);
    Fetch::Union(*valid)
}

/// Grow `valid` sideways to include `requested` when that stays a rectangle
///
/// Returns the grown region and the strip that must be fetched.
fn extend_band(valid: &Rect, requested: &Rect) -> Option<(Rect, Rect)> {
    let within_rows = requested.top >= valid.top && requested.bottom <= valid.bottom;
    let touches_x = requested.left <= valid.right && requested.right >= valid.left;
    if within_rows && touches_x {
        let grown = Rect::new(
            valid.left.min(requested.left),
            valid.top,
            valid.right.max(requested.right),
            valid.bottom,
        );
        let strip = if grown.left < valid.left && grown.right > valid.right {
            grown
        } else if grown.left < valid.left {
            Rect::new(grown.left, valid.top, valid.left, valid.bottom)
        } else {
            Rect::new(valid.right, valid.top, grown.right, valid.bottom)
        };
        return Some((grown, strip));
    }

    let within_cols = requested.left >= valid.left && requested.right <= valid.right;
    let touches_y = requested.top <= valid.bottom && requested.bottom >= valid.top;
    if within_cols && touches_y {
        let grown = Rect::new(
            valid.left,
            valid.top.min(requested.top),
            valid.right,
            valid.bottom.max(requested.bottom),
        );
        let strip = if grown.top < valid.top && grown.bottom > valid.bottom {
            grown
        } else if grown.top < valid.top {
            Rect::new(valid.left, grown.top, valid.right, valid.top)
        } else {
            Rect::new(valid.left, valid.bottom, valid.right, grown.bottom)
        };
        return Some((grown, strip));
    }

    None
}
