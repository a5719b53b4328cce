/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Line-oriented listings: `resolve --list`, `bookmarks`, `branches`,
//! `tags`.

use std::collections::HashMap;

/// A bookmark from `hg bookmarks`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bookmark {
    pub name: String,
    pub revision: i64,
    pub node: String,
    /// Marked with `*` in the listing.
    pub active: bool,
}

/// A branch head from `hg branches`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BranchHead {
    pub name: String,
    pub revision: i64,
    pub node: String,
}

/// A tag from `hg tags`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagEntry {
    pub name: String,
    pub revision: i64,
    pub node: String,
    pub local: bool,
}

/// Parse `resolve --list` lines into path → resolved. `R` means resolved,
/// `U` unresolved.
pub fn parse_resolve(text: &str) -> HashMap<String, bool> {
    let mut map = HashMap::new();
    for line in text.split('\n').filter(|l| !l.is_empty()) {
        if line.len() > 2 {
            if let Some(path) = line.get(2..) {
                map.insert(path.trim().to_string(), line.starts_with('R'));
            }
        }
    }
    map
}

/// Split a listing line into its name part and a trailing `rev:node` pair.
/// Returns `None` for lines without one (`no bookmarks set` and friends).
fn split_name_revnode(line: &str) -> Option<(String, i64, String)> {
    let at = line.rfind(|c: char| c.is_whitespace())?;
    let name = line[..at].trim();
    let revnode = line[at..].trim();
    let colon = revnode.find(':')?;
    let revision = revnode[..colon].parse::<i64>().ok()?;
    let node = &revnode[colon + 1..];
    if name.is_empty() || node.is_empty() {
        return None;
    }
    Some((name.to_string(), revision, node.to_string()))
}

pub fn parse_bookmarks(text: &str) -> Vec<Bookmark> {
    let mut bookmarks = Vec::new();
    for line in text.split('\n').filter(|l| !l.is_empty()) {
        let active = line.starts_with(" * ");
        let rest = line.trim_start_matches(" * ");
        if let Some((name, revision, node)) = split_name_revnode(rest) {
            bookmarks.push(Bookmark {
                name,
                revision,
                node,
                active,
            });
        }
    }
    bookmarks
}

pub fn parse_branches(text: &str) -> Vec<BranchHead> {
    let mut branches = Vec::new();
    for line in text.split('\n').filter(|l| !l.is_empty()) {
        let line = line
            .trim_end_matches(" (inactive)")
            .trim_end_matches(" (closed)");
        if let Some((name, revision, node)) = split_name_revnode(line) {
            branches.push(BranchHead {
                name,
                revision,
                node,
            });
        }
    }
    branches
}

pub fn parse_tags(text: &str) -> Vec<TagEntry> {
    let mut tags = Vec::new();
    for line in text.split('\n').filter(|l| !l.is_empty()) {
        let local = line.ends_with(" local");
        let line = line.trim_end_matches(" local");
        if let Some((name, revision, node)) = split_name_revnode(line) {
            tags.push(TagEntry {
                name,
                revision,
                node,
                local,
            });
        }
    }
    tags
}

#[cfg(test)]
mod test {
    use maplit::hashmap;

    use super::*;

    #[test]
    fn resolve_listing() {
        let text = "R resolved.txt\nU conflicted.txt\n";
        assert_eq!(
            parse_resolve(text),
            hashmap! {
                "resolved.txt".to_string() => true,
                "conflicted.txt".to_string() => false,
            }
        );
    }

    #[test]
    fn bookmark_listing() {
        let text = " * main                      5:abc123def456\n   stale                     3:000111222333\n";
        let bookmarks = parse_bookmarks(text);
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].name, "main");
        assert_eq!(bookmarks[0].revision, 5);
        assert_eq!(bookmarks[0].node, "abc123def456");
        assert!(bookmarks[0].active);
        assert_eq!(bookmarks[1].name, "stale");
        assert!(!bookmarks[1].active);
    }

    #[test]
    fn no_bookmarks_set() {
        assert!(parse_bookmarks("no bookmarks set\n").is_empty());
    }

    #[test]
    fn branch_listing() {
        let text = "default                        5:abc123def456\nstable                         2:fff000fff000 (inactive)\n";
        let branches = parse_branches(text);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "default");
        assert_eq!(branches[1].name, "stable");
        assert_eq!(branches[1].revision, 2);
    }

    #[test]
    fn tag_listing() {
        let text = "tip                                5:abc123def456\nv1.0                               2:fff000fff000 local\n";
        let tags = parse_tags(text);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "tip");
        assert!(!tags[0].local);
        assert_eq!(tags[1].name, "v1.0");
        assert!(tags[1].local);
    }

    #[test]
    fn names_with_spaces() {
        let bookmarks = parse_bookmarks("   my feature bookmark     7:abcabcabcabc\n");
        assert_eq!(bookmarks[0].name, "my feature bookmark");
        assert_eq!(bookmarks[0].revision, 7);
    }
}
