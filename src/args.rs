/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Assembly of `runcommand` argument vectors.

use chrono::NaiveDateTime;

/// Format understood by `hg --date`.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An argument vector under construction, starting with the command name.
#[derive(Debug)]
pub(crate) struct Argv(Vec<String>);

impl Argv {
    pub fn new(command: &str) -> Self {
        Argv(vec![command.to_string()])
    }

    /// Command producing XML output: append `--style xml` up front.
    pub fn new_xml(command: &str) -> Self {
        let mut argv = Argv::new(command);
        argv.pair("--style", "xml");
        argv
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    pub fn extend<I: IntoIterator<Item = S>, S: Into<String>>(&mut self, args: I) {
        for arg in args {
            self.push(arg);
        }
    }

    /// Append `flag` iff `condition` holds.
    pub fn flag_if(&mut self, condition: bool, flag: &str) {
        if condition {
            self.push(flag);
        }
    }

    /// Append `flag` and `value` as two entries.
    pub fn pair(&mut self, flag: &str, value: impl Into<String>) {
        self.push(flag);
        self.push(value);
    }

    /// Append `flag` and `value` when the value is non-empty.
    pub fn pair_if_nonempty(&mut self, flag: &str, value: &str) {
        if !value.is_empty() {
            self.pair(flag, value);
        }
    }

    /// Append `flag` and `value` once per non-empty value.
    pub fn pairs_if_nonempty<'a>(&mut self, flag: &str, values: impl IntoIterator<Item = &'a String>) {
        for value in values {
            self.pair_if_nonempty(flag, value);
        }
    }

    /// Append `flag` and the date rendered as `yyyy-MM-dd HH:mm:ss` when a
    /// date is given.
    pub fn date_if(&mut self, flag: &str, date: Option<&NaiveDateTime>) {
        if let Some(date) = date {
            self.pair(flag, date.format(DATE_FORMAT).to_string());
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
