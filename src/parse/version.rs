/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! The `hg version` banner.

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::*;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"^[^\)]+\([^\d]+(?P<major>\d)\.(?P<minor>\d)((.(?P<trivial>\d))|(?P<additional>.*))\)"
    )
    .expect("version banner regex is valid");
}

/// Normalize the first line of the version banner, e.g.
/// `Mercurial Distributed SCM (version 5.7.1)` → `5.7.1`. A banner
/// without a trivial component renders a literal `0` in its place
/// (`(version 5.7)` → `5.70`).
pub fn parse(text: &str) -> Result<String> {
    let captures = VERSION_RE
        .captures(text)
        .ok_or_else(|| ErrorKind::Parse(format!("unrecognized version banner: {:?}", text)))?;

    let mut version = String::new();
    version.push_str(&captures["major"]);
    version.push('.');
    version.push_str(&captures["minor"]);
    match captures.name("trivial") {
        Some(trivial) => {
            version.push('.');
            version.push_str(trivial.as_str());
        }
        None => version.push('0'),
    }
    if let Some(additional) = captures.name("additional") {
        version.push_str(additional.as_str());
    }
    Ok(version)
}
