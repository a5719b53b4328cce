/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! The `HgClient` session: lifecycle, lazy repository properties and the
//! low-level command primitives the typed API is built on.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use encoding_rs::Encoding;
use log::{debug, info};

use crate::errors::*;
use crate::parse::kv;
use crate::parse::version;
use crate::server::{CommandIo, CommandOutput, Greeting, ServerHandle};

/// How long a one-shot `hg init` may take before it is killed.
const INIT_TIMEOUT: Duration = Duration::from_secs(5);
const INIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options for opening a session against an existing repository.
///
/// Every field has a default; `OpenOptions::default().open(path)` spawns
/// a plain `hg` from `PATH`.
#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// The server binary, by default `hg` resolved from `PATH`.
    pub hg_binary: PathBuf,
    /// When non-empty, exported to the server as `HGENCODING`.
    pub encoding: String,
    /// `key=value` overrides passed via a single `--config` argument.
    pub configs: Vec<String>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            hg_binary: PathBuf::from("hg"),
            encoding: String::new(),
            configs: Vec::new(),
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Spawn a command server for `repository` and perform the handshake.
    pub fn open(&self, repository: impl AsRef<Path>) -> Result<HgClient> {
        let repository = repository.as_ref();
        if !repository.join(".hg").is_dir() {
            return Err(
                ErrorKind::InvalidRepository(repository.display().to_string()).into(),
            );
        }

        let encoding = if self.encoding.is_empty() {
            None
        } else {
            Some(self.encoding.as_str())
        };
        let mut server =
            ServerHandle::spawn(&self.hg_binary, repository, &self.configs, encoding)?;
        let greeting = server.handshake()?;
        info!(
            "session open on {} ({})",
            repository.display(),
            greeting.encoding.name()
        );
        Ok(HgClient::from_server(server, greeting))
    }
}

struct Inner {
    server: ServerHandle,
    // Write-once caches; the repository is assumed not to be reconfigured
    // under a live session.
    config: Option<HashMap<String, String>>,
    root: Option<String>,
    version: Option<String>,
}

/// A session against one repository's command server.
///
/// Threads may share a client; commands serialize on the session mutex.
/// After a transport error the session is poisoned and every further
/// command fails with `ServerClosed`.
pub struct HgClient {
    inner: Mutex<Inner>,
    encoding: &'static Encoding,
    capabilities: HashSet<String>,
}

impl fmt::Debug for HgClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HgClient").finish_non_exhaustive()
    }
}

impl HgClient {
    /// Open with default options.
    pub fn open(repository: impl AsRef<Path>) -> Result<HgClient> {
        OpenOptions::new().open(repository)
    }

    pub(crate) fn from_server(server: ServerHandle, greeting: Greeting) -> HgClient {
        HgClient {
            inner: Mutex::new(Inner {
                server,
                config: None,
                root: None,
                version: None,
            }),
            encoding: greeting.encoding,
            capabilities: greeting.capabilities,
        }
    }

    /// Name of the encoding negotiated at handshake.
    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    /// Capability tokens the server advertised.
    pub fn capabilities(&self) -> &HashSet<String> {
        &self.capabilities
    }

    /// Terminate the server. Safe to call more than once; commands issued
    /// afterwards fail with `ServerClosed`.
    pub fn close(&self) {
        self.lock().server.close();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session lock poisoned")
    }

    fn encode_args<S: AsRef<str>>(&self, args: &[S]) -> Vec<Vec<u8>> {
        args.iter()
            .map(|arg| self.encoding.encode(arg.as_ref()).0.into_owned())
            .collect()
    }

    /// Run one command, routing channel payloads through `io`, and return
    /// its exit code. This is the rawest public primitive; most callers
    /// want `get_command_output` or the typed API.
    pub fn run_command<S: AsRef<str>>(&self, args: &[S], io: &mut CommandIo<'_>) -> Result<i32> {
        let encoded = self.encode_args(args);
        let mut inner = self.lock();
        inner.server.run_command(&encoded, io)
    }

    /// Run one command with stdout and stderr captured into a
    /// `CommandOutput`, decoded with the session encoding.
    pub fn get_command_output<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandOutput> {
        let encoded = self.encode_args(args);
        let mut inner = self.lock();
        run_captured(&mut inner.server, &encoded, self.encoding)
    }

    /// Run a command and apply its exit-code policy: codes outside
    /// `ok_codes` fail `CommandFailed` with the captured output.
    pub(crate) fn run_checked(&self, args: &[String], ok_codes: &[i32]) -> Result<CommandOutput> {
        let output = self.get_command_output(args)?;
        check_exit_code(output, ok_codes)
    }

    /// The repository root, from `hg root`. Cached for the session.
    pub fn root(&self) -> Result<String> {
        let encoded = self.encode_args(&["root"]);
        let mut inner = self.lock();
        if inner.root.is_none() {
            let output = run_captured(&mut inner.server, &encoded, self.encoding)?;
            let output = check_exit_code(output, &[0])?;
            inner.root = Some(output.stdout.trim_end().to_string());
        }
        Ok(inner.root.clone().expect("root cache was just filled"))
    }

    /// The server's normalized version. Cached for the session.
    pub fn version(&self) -> Result<String> {
        let encoded = self.encode_args(&["version"]);
        let mut inner = self.lock();
        if inner.version.is_none() {
            let output = run_captured(&mut inner.server, &encoded, self.encoding)?;
            let output = check_exit_code(output, &[0])?;
            inner.version = Some(version::parse(&output.stdout)?);
        }
        Ok(inner.version.clone().expect("version cache was just filled"))
    }

    /// The effective configuration, from `hg showconfig`. Cached for the
    /// session.
    pub fn config(&self) -> Result<HashMap<String, String>> {
        let encoded = self.encode_args(&["showconfig"]);
        let mut inner = self.lock();
        if inner.config.is_none() {
            let output = run_captured(&mut inner.server, &encoded, self.encoding)?;
            let output = check_exit_code(output, &[0])?;
            inner.config = Some(kv::parse(&output.stdout, &["="]));
        }
        Ok(inner.config.clone().expect("config cache was just filled"))
    }

    /// Create a repository with a transient `hg init`; does not use a
    /// command server. The process is killed if it outlives five seconds.
    pub fn init(destination: impl AsRef<Path>) -> Result<()> {
        Self::init_with(Path::new("hg"), destination.as_ref())
    }

    pub fn init_with(hg_binary: &Path, destination: &Path) -> Result<()> {
        info!("one-shot init of {}", destination.display());
        let mut child = Command::new(hg_binary)
            .arg("init")
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ErrorKind::ServerLaunchFailed(err.to_string()))?;

        let deadline = Instant::now() + INIT_TIMEOUT;
        let status = loop {
            match child
                .try_wait()
                .map_err(|err| ErrorKind::ServerLaunchFailed(err.to_string()))?
            {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ErrorKind::CommandFailed(CommandOutput {
                        stdout: String::new(),
                        stderr: "hg init did not finish within five seconds".to_string(),
                        exit_code: -1,
                    })
                    .into());
                }
                None => thread::sleep(INIT_POLL_INTERVAL),
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stdout.take() {
            let _ = pipe.read_to_string(&mut stdout);
        }
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        if !status.success() {
            return Err(ErrorKind::CommandFailed(CommandOutput {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
            })
            .into());
        }
        Ok(())
    }
}

fn run_captured(
    server: &mut ServerHandle,
    encoded_args: &[Vec<u8>],
    encoding: &'static Encoding,
) -> Result<CommandOutput> {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let exit_code = {
        let mut io = CommandIo {
            output: Some(&mut out),
            error: Some(&mut err),
            ..Default::default()
        };
        server.run_command(encoded_args, &mut io)?
    };
    debug!("command finished with exit code {}", exit_code);
    Ok(CommandOutput {
        stdout: encoding.decode(&out).0.into_owned(),
        stderr: encoding.decode(&err).0.into_owned(),
        exit_code,
    })
}

fn check_exit_code(output: CommandOutput, ok_codes: &[i32]) -> Result<CommandOutput> {
    if ok_codes.contains(&output.exit_code) {
        Ok(output)
    } else {
        Err(ErrorKind::CommandFailed(output).into())
    }
}


#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use assert_matches::assert_matches;

    use super::testutil::*;
    use crate::errors::ErrorKind;
    use crate::server::testing::response;

    #[test]
    fn session_exposes_handshake_fields() {
        let (client, _written) = test_client(Vec::new());
        assert_eq!(client.encoding(), "UTF-8");
        assert!(client.capabilities().contains("runcommand"));
        assert!(client.capabilities().contains("getencoding"));
    }

    #[test]
    fn command_output_is_decoded() {
        let (client, written) = test_client(response(b"out", b"warn", 0));
        let output = client.get_command_output(&["summary"]).unwrap();
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "warn");
        assert_eq!(output.exit_code, 0);
        assert_eq!(written.bytes(), request_bytes(&["summary"]));
    }

    #[test]
    fn root_is_cached() {
        // A single response; the second root() must not touch the stream.
        let (client, written) = test_client(response(b"/repo/root\n", b"", 0));
        assert_eq!(client.root().unwrap(), "/repo/root");
        assert_eq!(client.root().unwrap(), "/repo/root");
        assert_eq!(written.bytes(), request_bytes(&["root"]));
    }

    #[test]
    fn version_is_normalized_and_cached() {
        let (client, written) = test_client(response(
            b"Mercurial Distributed SCM (version 5.7.1)\n",
            b"",
            0,
        ));
        assert_eq!(client.version().unwrap(), "5.7.1");
        assert_eq!(client.version().unwrap(), "5.7.1");
        assert_eq!(written.bytes(), request_bytes(&["version"]));
    }

    #[test]
    fn config_is_parsed_and_cached() {
        let (client, written) = test_client(response(b"ui.username=alice\n", b"", 0));
        assert_eq!(client.config().unwrap()["ui.username"], "alice");
        assert_eq!(client.config().unwrap()["ui.username"], "alice");
        assert_eq!(written.bytes(), request_bytes(&["showconfig"]));
    }

    #[test]
    fn failed_command_carries_output() {
        let (client, _written) = test_client(response(b"", b"abort: no such file\n", 255));
        let err = client
            .run_checked(&["cat".to_string(), "gone".to_string()], &[0])
            .unwrap_err();
        match err.downcast_ref::<ErrorKind>() {
            Some(ErrorKind::CommandFailed(output)) => {
                assert_eq!(output.exit_code, 255);
                assert_eq!(output.stderr, "abort: no such file\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn threads_serialize_on_the_session() {
        let mut responses = Vec::new();
        for _ in 0..8 {
            responses.extend(response(b"thread output\n", b"", 0));
        }
        let (client, written) = test_client(responses);
        let client = Arc::new(client);

        let mut workers = Vec::new();
        for _ in 0..2 {
            let client = Arc::clone(&client);
            workers.push(thread::spawn(move || {
                let mut codes = Vec::new();
                for _ in 0..4 {
                    let output = client.get_command_output(&["summary"]).unwrap();
                    assert_eq!(output.stdout, "thread output\n");
                    codes.push(output.exit_code);
                }
                codes
            }));
        }

        let mut total = 0;
        for worker in workers {
            let codes = worker.join().unwrap();
            assert!(codes.iter().all(|code| *code == 0));
            total += codes.len();
        }
        assert_eq!(total, 8);

        // Eight whole requests, none interleaved.
        let expected: Vec<u8> = (0..8).flat_map(|_| request_bytes(&["summary"])).collect();
        assert_eq!(written.bytes(), expected);
    }

    #[test]
    fn poisoned_session_stays_closed() {
        let mut stream = b"X\x00\x00\x00\x00".to_vec();
        stream.extend(response(b"", b"", 0));
        let (client, _written) = test_client(stream);

        let err = client.get_command_output(&["summary"]).unwrap_err();
        assert_matches!(
            err.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::Protocol(..))
        );
        let err = client.get_command_output(&["summary"]).unwrap_err();
        assert_matches!(
            err.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::ServerClosed)
        );
    }

    #[test]
    fn close_is_idempotent() {
        let (client, _written) = test_client(Vec::new());
        client.close();
        client.close();
        let err = client.get_command_output(&["summary"]).unwrap_err();
        assert_matches!(
            err.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::ServerClosed)
        );
    }
}
