/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Client for the Mercurial command server.
//!
//! A session (`HgClient`) spawns `hg serve --cmdserver pipe` against a
//! repository and speaks the channel-framed pipe protocol over the
//! child's stdio: requests are `runcommand` blocks, responses are frames
//! tagged `o`/`e`/`d` for output, `r` for the exit code and `I`/`L` for
//! input prompts. On top of that transport the crate exposes one typed
//! method per Mercurial command.
//!
//! Sessions are thread-aware but not parallel: a session-wide mutex
//! serializes commands, and independent sessions each own their server
//! process. `init` and `clone` are one-shot subprocess invocations that
//! bypass the server entirely.

mod args;
mod client;
mod commands;
mod encoding;
mod errors;
mod parse;
pub mod protocol;
mod server;

pub use client::{HgClient, OpenOptions};
pub use commands::{
    AnnotateOptions, ArchiveOptions, ArchiveType, BookmarkOptions, CloneOptions, CommitOptions,
    DiffOptions, LogOptions, MergeOptions, PullOptions, PushOptions, RemoteDiffOptions,
    RevertOptions, StatusOptions, TagOptions, UpdateOptions,
};
pub use errors::{Error, ErrorKind, Result};
pub use parse::lists::{Bookmark, BranchHead, TagEntry};
pub use parse::status::FileStatus;
pub use parse::xmllog::Revision;
pub use protocol::{Channel, FrameHeader, ServerMessage};
pub use server::{CommandIo, CommandOutput};
