/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Resolution of the encoding name the server advertises at handshake.

use encoding_rs::Encoding;

/// Look up an encoding by the name found in the handshake. Codepage
/// aliases of the form `cpNNN` resolve to the `windows-NNN` code page
/// when the name itself is not a registered label.
pub fn resolve(name: &str) -> Option<&'static Encoding> {
    let name = name.trim();
    if let Some(encoding) = Encoding::for_label(name.as_bytes()) {
        return Some(encoding);
    }
    let digits = name
        .strip_prefix("cp")
        .or_else(|| name.strip_prefix("CP"))
        .or_else(|| name.strip_prefix("Cp"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Encoding::for_label(format!("windows-{}", digits).as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolves_utf8() {
        assert_eq!(resolve("UTF-8").unwrap().name(), "UTF-8");
        assert_eq!(resolve("utf-8").unwrap().name(), "UTF-8");
        assert_eq!(resolve(" ascii ").unwrap().name(), "windows-1252");
    }

    #[test]
    fn resolves_codepage_aliases() {
        assert_eq!(resolve("cp1251").unwrap().name(), "windows-1251");
        assert_eq!(resolve("CP1250").unwrap().name(), "windows-1250");
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(resolve("martian").is_none());
        assert!(resolve("cpx").is_none());
        assert!(resolve("cp").is_none());
    }
}
