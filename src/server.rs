/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! The command server session: child process, handshake and the
//! per-command exchange loop.

use std::collections::HashSet;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use byteorder::{BigEndian, ByteOrder};
use encoding_rs::Encoding;
use log::{debug, trace};

use crate::encoding;
use crate::errors::*;
use crate::parse::kv;
use crate::protocol::{self, Channel, FrameHeader};

/// The two pipe endpoints of a running server, behind trait objects so
/// prerecorded streams can stand in for a child process.
pub(crate) struct Connection {
    tx: Box<dyn Write + Send>,
    rx: Box<dyn Read + Send>,
}

/// What the server advertises in its first frame.
#[derive(Debug)]
pub(crate) struct Greeting {
    pub encoding: &'static Encoding,
    pub capabilities: HashSet<String>,
}

/// Output sinks and input providers for one command. Unmapped output
/// channels are discarded; unmapped input prompts are answered with an
/// empty block.
#[derive(Default)]
pub struct CommandIo<'a> {
    pub output: Option<&'a mut dyn Write>,
    pub error: Option<&'a mut dyn Write>,
    pub debug: Option<&'a mut dyn Write>,
    pub input: Option<&'a mut dyn FnMut(usize) -> Vec<u8>>,
    pub line: Option<&'a mut dyn FnMut(usize) -> Vec<u8>>,
}

/// Captured output of one command, decoded with the session encoding.
#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "exit code {}", self.exit_code)?;
        if !self.stderr.is_empty() {
            write!(fmt, ": {}", self.stderr.trim_end())?;
        }
        if !self.stdout.is_empty() {
            write!(fmt, ": {}", self.stdout.trim_end())?;
        }
        Ok(())
    }
}

/// A spawned (or substituted) command server. Callers must serialize
/// access; `HgClient` wraps this in the session mutex.
pub(crate) struct ServerHandle {
    conn: Connection,
    child: Option<Child>,
    poisoned: bool,
    closed: bool,
}

impl ServerHandle {
    /// Spawn `hg serve --cmdserver pipe` against `repository`.
    pub fn spawn(
        hg_binary: &Path,
        repository: &Path,
        configs: &[String],
        encoding: Option<&str>,
    ) -> Result<ServerHandle> {
        let mut command = Command::new(hg_binary);
        command
            .arg("serve")
            .arg("--cmdserver")
            .arg("pipe")
            .arg("--cwd")
            .arg(repository)
            .arg("--repository")
            .arg(repository);
        if !configs.is_empty() {
            command.arg("--config").arg(configs.join(","));
        }
        command.env("LANG", "en_US");
        match encoding {
            Some(enc) if !enc.is_empty() => {
                command.env("HGENCODING", enc);
            }
            _ => {}
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("launching command server: {:?}", command);
        let mut child = command
            .spawn()
            .map_err(|err| ErrorKind::ServerLaunchFailed(err.to_string()))?;
        let stdin = child.stdin.take().expect("child stdin is piped");
        let stdout = child.stdout.take().expect("child stdout is piped");

        Ok(ServerHandle {
            conn: Connection {
                tx: Box::new(stdin),
                rx: Box::new(stdout),
            },
            child: Some(child),
            poisoned: false,
            closed: false,
        })
    }

    /// Session over arbitrary pipes; used with prerecorded frame streams.
    #[cfg(test)]
    pub fn from_pipes(tx: Box<dyn Write + Send>, rx: Box<dyn Read + Send>) -> ServerHandle {
        ServerHandle {
            conn: Connection { tx, rx },
            child: None,
            poisoned: false,
            closed: false,
        }
    }

    /// Read and validate the greeting frame. Must be called exactly once,
    /// before the first command.
    pub fn handshake(&mut self) -> Result<Greeting> {
        let message = protocol::read_message(&mut self.conn.rx)?;
        let payload = match message {
            protocol::ServerMessage::Data(Channel::Output, payload) => payload,
            other => {
                debug!("unexpected greeting frame: {:?}", other);
                return Err(ErrorKind::Handshake("greeting not on the output channel".into()).into());
            }
        };

        // Greeting headers are ASCII; the encoding they name applies to
        // everything after them.
        let text = String::from_utf8_lossy(&payload);
        let fields = kv::parse(&text, &[": "]);

        let capabilities = fields
            .get("capabilities")
            .ok_or_else(|| Error::from(ErrorKind::Handshake("missing capabilities header".into())))?
            .split_whitespace()
            .map(|token| token.to_string())
            .collect::<HashSet<String>>();
        if !capabilities.contains("runcommand") {
            return Err(ErrorKind::Handshake("server does not offer runcommand".into()).into());
        }

        let encoding_name = fields
            .get("encoding")
            .ok_or_else(|| Error::from(ErrorKind::Handshake("missing encoding header".into())))?;
        let encoding = encoding::resolve(encoding_name).ok_or_else(|| {
            Error::from(ErrorKind::Handshake(format!(
                "unknown encoding '{}'",
                encoding_name
            )))
        })?;

        debug!(
            "command server ready: encoding {}, {} capabilities",
            encoding.name(),
            capabilities.len()
        );
        Ok(Greeting {
            encoding,
            capabilities,
        })
    }

    /// Send one `runcommand` request and drive the response until its
    /// Result frame. Any error here leaves the transport in an unknown
    /// state: the session is poisoned and refuses further commands.
    pub fn run_command(&mut self, args: &[Vec<u8>], io: &mut CommandIo<'_>) -> Result<i32> {
        if self.closed || self.poisoned {
            return Err(ErrorKind::ServerClosed.into());
        }
        match self.exchange(args, io) {
            Ok(code) => Ok(code),
            Err(err) => {
                self.poisoned = true;
                debug!("session poisoned: {}", err);
                if let Some(sink) = io.output.as_deref_mut() {
                    let _ = sink.flush();
                }
                if let Some(sink) = io.error.as_deref_mut() {
                    let _ = sink.flush();
                }
                Err(err)
            }
        }
    }

    fn exchange(&mut self, args: &[Vec<u8>], io: &mut CommandIo<'_>) -> Result<i32> {
        protocol::write_command(&mut self.conn.tx, args)?;
        loop {
            let FrameHeader { channel, length } = protocol::read_header(&mut self.conn.rx)?;
            trace!("frame: {:?} length {}", channel, length);
            match channel {
                Channel::Result => {
                    if length != 4 {
                        return Err(ErrorKind::Protocol("result frame is not four bytes").into());
                    }
                    let mut code = [0u8; 4];
                    self.conn
                        .rx
                        .read_exact(&mut code)
                        .map_err(|_| Error::from(ErrorKind::ServerClosed))?;
                    return Ok(BigEndian::read_i32(&code));
                }
                Channel::Output => match io.output {
                    Some(ref mut w) => {
                        protocol::copy_payload(&mut self.conn.rx, length, Some(&mut **w))?
                    }
                    None => protocol::copy_payload(&mut self.conn.rx, length, None)?,
                },
                Channel::Error => match io.error {
                    Some(ref mut w) => {
                        protocol::copy_payload(&mut self.conn.rx, length, Some(&mut **w))?
                    }
                    None => protocol::copy_payload(&mut self.conn.rx, length, None)?,
                },
                Channel::Debug => match io.debug {
                    Some(ref mut w) => {
                        protocol::copy_payload(&mut self.conn.rx, length, Some(&mut **w))?
                    }
                    None => protocol::copy_payload(&mut self.conn.rx, length, None)?,
                },
                Channel::Input => {
                    let block = match io.input.as_mut() {
                        Some(provider) => provider(length as usize),
                        None => Vec::new(),
                    };
                    protocol::write_block(&mut self.conn.tx, &block)?;
                }
                Channel::Line => {
                    let block = match io.line.as_mut() {
                        Some(provider) => provider(length as usize),
                        None => Vec::new(),
                    };
                    protocol::write_block(&mut self.conn.tx, &block)?;
                }
            }
        }
    }

    /// Terminate the child and release the pipes. Safe to call twice.
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(mut child) = self.child.take() {
            debug!("terminating command server pid {}", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.close();
    }
}
