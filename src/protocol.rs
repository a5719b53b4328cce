/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! Wire framing for the command server pipe protocol.
//!
//! Every frame the server emits is a 5-byte header (one ASCII channel tag
//! plus a big-endian u32 length) followed by the payload. The `o`, `e`,
//! `r` and `d` channels carry payload bytes; for the `I` and `L` prompt
//! channels the length field itself is the number of bytes the server is
//! asking for and no payload follows.

use std::cmp;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Bytes;
use log::trace;

use crate::errors::*;

/// Payloads are relayed to output sinks in chunks of this size, so a
/// frame length near u32::MAX never needs a contiguous buffer.
pub(crate) const IO_CHUNK_SIZE: usize = 64 * 1024;

/// One of the six logical streams multiplexed over the server's stdout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Channel {
    /// `o`: command output bytes.
    Output,
    /// `e`: command error bytes.
    Error,
    /// `r`: terminates a command; payload is the exit code.
    Result,
    /// `d`: debug bytes.
    Debug,
    /// `I`: the server asks for up to N bytes of bulk input.
    Input,
    /// `L`: the server asks for up to N bytes of line input.
    Line,
}

impl Channel {
    pub fn from_byte(byte: u8) -> Option<Channel> {
        match byte {
            b'o' => Some(Channel::Output),
            b'e' => Some(Channel::Error),
            b'r' => Some(Channel::Result),
            b'd' => Some(Channel::Debug),
            b'I' => Some(Channel::Input),
            b'L' => Some(Channel::Line),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Channel::Output => b'o',
            Channel::Error => b'e',
            Channel::Result => b'r',
            Channel::Debug => b'd',
            Channel::Input => b'I',
            Channel::Line => b'L',
        }
    }

    /// Input and Line frames carry a requested size instead of payload
    /// bytes.
    pub fn is_prompt(&self) -> bool {
        match self {
            Channel::Input | Channel::Line => true,
            _ => false,
        }
    }
}

/// Decoded frame header: the channel tag and the length field. For data
/// channels the length is the payload size still to be read off the pipe;
/// for prompt channels it is the requested input size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub channel: Channel,
    pub length: u32,
}

/// A fully decoded server frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerMessage {
    /// Payload bytes on one of the `o`/`e`/`d` channels.
    Data(Channel, Bytes),
    /// The command's exit code, from the `r` channel.
    ResultCode(i32),
    /// An `I`/`L` prompt for up to `size` bytes of input.
    InputRequest { channel: Channel, size: u32 },
}

fn closed(err: io::Error) -> Error {
    trace!("server pipe error treated as closed: {}", err);
    ErrorKind::ServerClosed.into()
}

/// Read the 5-byte frame header. EOF before a full header is
/// `ServerClosed`; a tag byte outside `o e r d I L` is a protocol error.
pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<FrameHeader> {
    let mut header = [0u8; 5];
    reader.read_exact(&mut header).map_err(closed)?;

    let channel = Channel::from_byte(header[0])
        .ok_or_else(|| Error::from(ErrorKind::Protocol("invalid channel identifier")))?;
    let length = BigEndian::read_u32(&header[1..5]);
    Ok(FrameHeader { channel, length })
}

/// Relay `length` payload bytes from the server pipe into `sink`,
/// discarding them when no sink is mapped. The length is widened to u64
/// before any arithmetic so values past 2^31 cannot sign-extend.
pub fn copy_payload<R: Read + ?Sized>(
    reader: &mut R,
    length: u32,
    mut sink: Option<&mut dyn Write>,
) -> Result<()> {
    let mut remaining = u64::from(length);
    let mut buf = [0u8; IO_CHUNK_SIZE];
    while remaining > 0 {
        let want = cmp::min(remaining, IO_CHUNK_SIZE as u64) as usize;
        let got = match reader.read(&mut buf[..want]) {
            Ok(0) => return Err(ErrorKind::ServerClosed.into()),
            Ok(got) => got,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(closed(err)),
        };
        if let Some(sink) = sink.as_mut() {
            sink.write_all(&buf[..got])?;
        }
        remaining -= got as u64;
    }
    Ok(())
}

/// Read and materialize one complete frame. Data payloads are buffered in
/// memory, so this is for the handshake and other frames known to be
/// small; the command loop streams payloads with `copy_payload` instead.
pub fn read_message<R: Read + ?Sized>(reader: &mut R) -> Result<ServerMessage> {
    let FrameHeader { channel, length } = read_header(reader)?;

    if channel.is_prompt() {
        return Ok(ServerMessage::InputRequest {
            channel,
            size: length,
        });
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).map_err(closed)?;

    if channel == Channel::Result {
        if payload.len() != 4 {
            return Err(ErrorKind::Protocol("result frame is not four bytes").into());
        }
        return Ok(ServerMessage::ResultCode(BigEndian::read_i32(&payload)));
    }
    Ok(ServerMessage::Data(channel, Bytes::from(payload)))
}

/// Encode a data-carrying frame the way the server does. The client never
/// sends frames; this exists for protocol tests and prerecorded streams.
pub fn write_data_frame<W: Write + ?Sized>(
    writer: &mut W,
    channel: Channel,
    payload: &[u8],
) -> io::Result<()> {
    debug_assert!(!channel.is_prompt(), "prompt frames carry no payload");
    writer.write_all(&[channel.as_byte()])?;
    writer.write_u32::<BigEndian>(payload.len() as u32)?;
    writer.write_all(payload)
}

/// Encode an `I`/`L` prompt frame: header only, length = requested size.
pub fn write_prompt_frame<W: Write + ?Sized>(
    writer: &mut W,
    channel: Channel,
    size: u32,
) -> io::Result<()> {
    debug_assert!(channel.is_prompt());
    writer.write_all(&[channel.as_byte()])?;
    writer.write_u32::<BigEndian>(size)
}

/// Write a `runcommand` request: the literal `runcommand\n`, a big-endian
/// length, then the NUL-joined argument block (no trailing NUL).
pub fn write_command<W: Write + ?Sized>(writer: &mut W, args: &[Vec<u8>]) -> Result<()> {
    let mut block = Vec::with_capacity(args.iter().map(|a| a.len() + 1).sum::<usize>());
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            block.push(0);
        }
        block.extend_from_slice(arg);
    }

    writer.write_all(b"runcommand\n").map_err(closed)?;
    writer
        .write_u32::<BigEndian>(block.len() as u32)
        .map_err(closed)?;
    writer.write_all(&block).map_err(closed)?;
    writer.flush().map_err(closed)?;
    Ok(())
}

/// Answer an input prompt: a big-endian length then the data block. An
/// empty block tells the server there is no more input.
pub fn write_block<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<()> {
    writer
        .write_u32::<BigEndian>(data.len() as u32)
        .map_err(closed)?;
    writer.write_all(data).map_err(closed)?;
    writer.flush().map_err(closed)?;
    Ok(())
}
