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

//! Unit tests for GS memory descriptors

use super::*;
use proptest::prelude::*;

fn arb_psm() -> impl Strategy<Value = Psm> {
    prop_oneof![
        Just(Psm::Psmct32),
        Just(Psm::Psmct24),
        Just(Psm::Psmct16),
        Just(Psm::Psmct16s),
        Just(Psm::Psmt8),
        Just(Psm::Psmt4),
        Just(Psm::Psmt8h),
        Just(Psm::Psmt4hl),
        Just(Psm::Psmt4hh),
        Just(Psm::Psmz32),
        Just(Psm::Psmz24),
        Just(Psm::Psmz16),
        Just(Psm::Psmz16s),
    ]
}

fn arb_descriptor() -> impl Strategy<Value = MemoryDescriptor> {
    (0u32..4, 1u32..11, arb_psm(), 0u8..11, 0u8..11).prop_map(|(page, bw, psm, tw, th)| {
        MemoryDescriptor::texture(page * BLOCKS_PER_PAGE, bw, psm, tw, th)
    })
}

proptest! {
    #[test]
    fn prop_shares_bits_symmetric(a in arb_descriptor(), b in arb_descriptor()) {
        prop_assert_eq!(a.shares_bits(&b), b.shares_bits(&a));
    }

    #[test]
    fn prop_row_offset_antisymmetric(a in arb_descriptor(), b in arb_descriptor()) {
        let ab = a.row_offset_of(&b);
        let ba = b.row_offset_of(&a);
        prop_assert_eq!(ab.is_some(), ba.is_some());
        if let (Some(y1), Some(y2)) = (ab, ba) {
            prop_assert_eq!(y1, -y2);
        }
    }
}

#[test]
fn test_shares_bits_requires_same_base() {
    let a = MemoryDescriptor::buffer(0x0000, 10, Psm::Psmct32);
    let b = MemoryDescriptor::buffer(0x0020, 10, Psm::Psmct32);
    assert!(!a.shares_bits(&b));
    assert!(a.shares_bits(&MemoryDescriptor::buffer(0, 4, Psm::Psmt4)));
}

#[test]
fn test_span_rounds_to_page_rows() {
    // 640 pixels wide, 32-bit: 10 pages per row, 32 rows per page
    let fb = MemoryDescriptor::buffer(0x100, 10, Psm::Psmct32);
    let span = fb.span(&Rect::new(0, 0, 64, 32));
    assert_eq!(span, BlockSpan { start: 0x100, end: 0x100 + 10 * 32 });

    let span = fb.span(&Rect::new(0, 40, 64, 70));
    assert_eq!(span.start, 0x100 + 10 * 32);
    assert_eq!(span.end, 0x100 + 3 * 10 * 32);
}

#[test]
fn test_span_overlap() {
    let a = BlockSpan { start: 0, end: 32 };
    let b = BlockSpan { start: 32, end: 64 };
    assert!(!a.overlaps(&b));
    assert!(a.overlaps(&BlockSpan { start: 31, end: 33 }));
    assert!(!a.overlaps(&BlockSpan::EMPTY));
}

#[test]
fn test_row_offset_counts_whole_rows() {
    let base = MemoryDescriptor::buffer(0, 4, Psm::Psmct32);
    // 4 pages per row: page 8 starts row 2
    let later = MemoryDescriptor::buffer(8 * BLOCKS_PER_PAGE, 4, Psm::Psmct32);
    assert_eq!(base.row_offset_of(&later), Some(64));
    assert_eq!(later.row_offset_of(&base), Some(-64));
}

#[test]
fn test_row_offset_rejects_partial_rows_and_other_layouts() {
    let base = MemoryDescriptor::buffer(0, 4, Psm::Psmct32);
    // Page 5 is column 1 of row 1: its later columns land on row 2
    assert_eq!(base.row_offset_of(&MemoryDescriptor::buffer(5 * BLOCKS_PER_PAGE, 4, Psm::Psmct32)), None);
    assert_eq!(base.row_offset_of(&MemoryDescriptor::buffer(8, 4, Psm::Psmct32)), None);
    assert_eq!(base.row_offset_of(&MemoryDescriptor::buffer(128, 4, Psm::Psmct16)), None);
    assert_eq!(base.row_offset_of(&MemoryDescriptor::buffer(128, 8, Psm::Psmct32)), None);
}

#[test]
fn test_span_of_rect_wider_than_row() {
    // One 64-pixel page per row: a 256-wide row of texels touches 4 pages
    let tex = MemoryDescriptor::texture(0, 1, Psm::Psmct32, 8, 5);
    assert_eq!(tex.row_width_px(), 64);
    assert_eq!(tex.span(&tex.extent()), BlockSpan { start: 0, end: 4 * BLOCKS_PER_PAGE });
}

#[test]
fn test_clamp_region_clamp_bounds() {
    let clamp = Clamp {
        wms: WrapMode::RegionClamp,
        wmt: WrapMode::Clamp,
        minu: 16,
        maxu: 31,
        minv: 0,
        maxv: 0,
    };
    let extent = Rect::with_size(64, 64);
    assert_eq!(clamp.region(&extent), Rect::new(16, 0, 32, 64));
}

#[test]
fn test_clamp_sample_rect_wrapping_axis_uses_full_extent() {
    let extent = Rect::with_size(64, 64);
    let repeat = Clamp::new(WrapMode::Repeat, WrapMode::Clamp);
    let uv = Rect::new(-8, 4, 40, 200);
    assert_eq!(repeat.sample_rect(&extent, Some(&uv)), Rect::new(0, 4, 64, 64));
    assert_eq!(repeat.sample_rect(&extent, None), extent);
}

#[test]
fn test_clamp_interchangeable_only_inside_both_regions() {
    let extent = Rect::with_size(256, 256);
    let repeat = Clamp::new(WrapMode::Repeat, WrapMode::Repeat);
    let clamp = Clamp::new(WrapMode::Clamp, WrapMode::Clamp);
    let inside = Rect::new(10, 10, 200, 200);
    let outside = Rect::new(-10, 10, 200, 200);
    assert!(repeat.interchangeable(&clamp, &extent, Some(&inside)));
    assert!(!repeat.interchangeable(&clamp, &extent, Some(&outside)));

    let region = Clamp {
        wms: WrapMode::RegionClamp,
        wmt: WrapMode::Clamp,
        minu: 0,
        maxu: 63,
        minv: 0,
        maxv: 0,
    };
    assert!(!region.interchangeable(&clamp, &extent, None));
    assert!(region.interchangeable(&clamp, &extent, Some(&Rect::new(0, 0, 64, 64))));
}
