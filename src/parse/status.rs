/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! `hg status` output.

use std::collections::HashMap;

/// State of a file as reported in the first column of `hg status`.
///
/// `Default` and `All` never appear in output; they exist as filter inputs
/// to the status command (`All` maps to `--all`, `Default` to no flag).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileStatus {
    /// `M`
    Modified,
    /// `A`
    Added,
    /// `R`
    Removed,
    /// `C`
    Clean,
    /// `!`
    Missing,
    /// `?`
    Unknown,
    /// `I`
    Ignored,
    /// A space: the line names the origin of the preceding copy/move.
    Origin,
    /// `U`
    Conflicted,
    /// Filter input: the command's default selection.
    Default,
    /// Filter input: every state (`--all`).
    All,
}

impl FileStatus {
    /// Reverse lookup from the status-column character. Unrecognized
    /// characters are reported as `Clean`.
    pub fn from_char(c: char) -> FileStatus {
        match c {
            'M' => FileStatus::Modified,
            'A' => FileStatus::Added,
            'R' => FileStatus::Removed,
            'C' => FileStatus::Clean,
            '!' => FileStatus::Missing,
            '?' => FileStatus::Unknown,
            'I' => FileStatus::Ignored,
            ' ' => FileStatus::Origin,
            'U' => FileStatus::Conflicted,
            _ => FileStatus::Clean,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            FileStatus::Modified => Some('M'),
            FileStatus::Added => Some('A'),
            FileStatus::Removed => Some('R'),
            FileStatus::Clean => Some('C'),
            FileStatus::Missing => Some('!'),
            FileStatus::Unknown => Some('?'),
            FileStatus::Ignored => Some('I'),
            FileStatus::Origin => Some(' '),
            FileStatus::Conflicted => Some('U'),
            FileStatus::Default | FileStatus::All => None,
        }
    }

    /// The `hg status` flag selecting this state, for filter inputs.
    pub(crate) fn as_filter_flag(&self) -> Option<&'static str> {
        match self {
            FileStatus::Modified => Some("--modified"),
            FileStatus::Added => Some("--added"),
            FileStatus::Removed => Some("--removed"),
            FileStatus::Clean => Some("--clean"),
            FileStatus::Missing => Some("--deleted"),
            FileStatus::Unknown => Some("--unknown"),
            FileStatus::Ignored => Some("--ignored"),
            FileStatus::Origin => Some("--copies"),
            FileStatus::All => Some("--all"),
            FileStatus::Conflicted | FileStatus::Default => None,
        }
    }
}

/// Parse status lines into a path → state map. Lines shorter than three
/// characters are skipped; the path starts at the third column.
pub fn parse(text: &str) -> HashMap<String, FileStatus> {
    let mut map = HashMap::new();
    for line in text.split('\n').filter(|l| !l.is_empty()) {
        if line.len() > 2 {
            let code = line.chars().next().expect("line is non-empty");
            if let Some(path) = line.get(2..) {
                map.insert(path.to_string(), FileStatus::from_char(code));
            }
        }
    }
    map
}
