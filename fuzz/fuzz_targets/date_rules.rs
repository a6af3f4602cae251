// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use culler::dates::{DateExtractor, DateRule};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    last_underscore: bool,
    filename: String,
}

fuzz_target!(|input: Input| {
    let rule = if input.last_underscore {
        DateRule::LastUnderscore
    } else {
        DateRule::FirstUnderscore
    };
    if let Some(token) = rule.extract(&input.filename) {
        assert!(!token.is_empty());
        assert!(!token.contains('_'));
    }
});
