/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

pub use failure::{Error, Fail};

use crate::server::CommandOutput;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "'{}' is not the root of a mercurial repository", _0)]
    InvalidRepository(String),
    #[fail(display = "failed to launch command server: {}", _0)]
    ServerLaunchFailed(String),
    #[fail(display = "malformed handshake: {}", _0)]
    Handshake(String),
    #[fail(display = "command server closed the connection")]
    ServerClosed,
    #[fail(display = "protocol error: {}", _0)]
    Protocol(&'static str),
    #[fail(display = "command failed: {}", _0)]
    CommandFailed(CommandOutput),
    #[fail(display = "unparsable command output: {}", _0)]
    Parse(String),
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(&'static str),
}
