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

//! Rectangle algebra and GS-to-device scaling
//!
//! All rectangles are half-open: `left..right` by `top..bottom`. A rectangle
//! with `right <= left` or `bottom <= top` is empty, and every empty rectangle
//! compares as contained in every other rectangle.

use serde::{Deserialize, Serialize};

/// Half-open integer rectangle in GS pixel space (or device space after scaling)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge X coordinate (inclusive)
    pub left: i32,

    /// Top edge Y coordinate (inclusive)
    pub top: i32,

    /// Right edge X coordinate (exclusive)
    pub right: i32,

    /// Bottom edge Y coordinate (exclusive)
    pub bottom: i32,
}

impl Rect {
    /// The canonical empty rectangle
    pub const EMPTY: Rect = Rect {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Create a rectangle from its four edges
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle anchored at the origin
    ///
    /// # Example
    ///
    /// ```
    /// use gsrx::core::geometry::Rect;
    ///
    /// let r = Rect::with_size(256, 128);
    /// assert_eq!(r.area(), 256 * 128);
    /// ```
    pub const fn with_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Number of pixels covered (0 for empty rectangles)
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Check whether `other` lies entirely inside `self`
    pub fn contains(&self, other: &Rect) -> bool {
        if other.is_empty() {
            return true;
        }
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// Intersection of two rectangles, normalized to [`Rect::EMPTY`]
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() {
            Rect::EMPTY
        } else {
            r
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Bounding box of two rectangles (empty operands are ignored)
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// The four bands of `self` left over after cutting out `hole`
    ///
    /// Returned in left, top, right, bottom order. Each band spans the full
    /// extent of `self` along the other axis, so the bands overlap at the
    /// corners; any one of them is a rectangle that excludes `hole`.
    pub fn bands_around(&self, hole: &Rect) -> [Rect; 4] {
        let clip = |r: Rect| r.intersect(self);
        [
            clip(Rect::new(self.left, self.top, hole.left, self.bottom)),
            clip(Rect::new(self.left, self.top, self.right, hole.top)),
            clip(Rect::new(hole.right, self.top, self.right, self.bottom)),
            clip(Rect::new(self.left, hole.bottom, self.right, self.bottom)),
        ]
    }
}

/// Ratio between device pixels and GS pixels for one surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Scale {
    pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

    /// Derive a scale from device pixel dimensions and GS logical dimensions
    ///
    /// Degenerate logical sizes fall back to 1.0 on that axis.
    pub fn from_sizes(device: (u32, u32), logical: (u32, u32)) -> Self {
        let ratio = |d: u32, l: u32| if l == 0 { 1.0 } else { d as f32 / l as f32 };
        Self {
            x: ratio(device.0, logical.0),
            y: ratio(device.1, logical.1),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Convert a GS-space rectangle to device space
    ///
    /// Edges are expanded outwards so the device rectangle always covers every
    /// device pixel touched by the GS rectangle.
    pub fn apply(&self, r: &Rect) -> Rect {
        if self.is_identity() {
            return *r;
        }
        Rect::new(
            (r.left as f32 * self.x).floor() as i32,
            (r.top as f32 * self.y).floor() as i32,
            (r.right as f32 * self.x).ceil() as i32,
            (r.bottom as f32 * self.y).ceil() as i32,
        )
    }
}
