/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Delimited key/value output: handshake headers (`key: value`),
//! `showconfig` and `paths` (`key=value`).

use std::collections::HashMap;

/// Split each line on the first occurrence of any delimiter in `delims`.
/// Lines that do not split into two parts are dropped. Both parts are
/// trimmed: `hg paths` pads around its `=`.
pub fn parse(text: &str, delims: &[&str]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.split('\n') {
        let split = delims
            .iter()
            .filter_map(|d| line.find(d).map(|at| (at, d.len())))
            .min();
        if let Some((at, width)) = split {
            let key = line[..at].trim();
            let value = line[at + width..].trim();
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}
