// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::num::NonZeroUsize;

use tessera::encoding::{clip, paint};
use tessera::peniko::color::palette;
use tessera::peniko::Color;
use tessera::{record_parallel, Ops};
use tessera_tests::{render_sync, TestParams};

const COLORS: [Color; 4] = [
    palette::css::RED,
    palette::css::LIME,
    palette::css::BLUE,
    palette::css::YELLOW,
];

fn tile(ops: &mut Ops, i: usize) {
    let x = i as i32 * 10;
    paint::fill_shape(ops, COLORS[i], &clip::Rect::new(x, 0, x + 15, 10).op());
}

#[test]
fn parallel_recording_matches_sequential() {
    let params = TestParams::new("parallel", 60, 10);

    let mut sequential = Ops::new();
    for i in 0..COLORS.len() {
        tile(&mut sequential, i);
    }
    let expected = render_sync(&sequential, &params).unwrap();

    let jobs: Vec<_> = (0..COLORS.len())
        .map(|i| move |ops: &mut Ops| tile(ops, i))
        .collect();
    let calls = record_parallel(jobs, NonZeroUsize::new(2)).unwrap();
    let mut frame = Ops::new();
    for call in &calls {
        call.add(&mut frame);
    }
    let image = render_sync(&frame, &params).unwrap();

    assert_eq!(image.data, expected.data);
    // Overlapping tiles show the later one.
    assert_eq!(image.pixel(12, 5), [0, 255, 0, 255]);
}
