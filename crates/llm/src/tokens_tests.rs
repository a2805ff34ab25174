// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_text_has_zero_tokens() {
    let counter = TokenCounter::new().unwrap();
    assert_eq!(counter.count(""), 0);
}

#[test]
fn longer_text_has_more_tokens() {
    let counter = TokenCounter::new().unwrap();
    let short = counter.count("fn main() {}");
    let long = counter.count(&"fn main() {}\n".repeat(50));
    assert!(long > short);
    assert!(short > 0);
}

#[test]
fn counter_is_cheap_to_clone_and_consistent() {
    let counter = TokenCounter::new().unwrap();
    let clone = counter.clone();
    let text = "const x = require('lodash');";
    assert_eq!(counter.count(text), clone.count(text));
}
