/*
 * Copyright (c) Facebook, Inc. and its affiliates.
 *
 * This software may be used and distributed according to the terms of the
 * GNU General Public License version 2.
 */

//! The typed command API: one method per Mercurial command, mapping
//! options structs to argument vectors and command output to typed
//! results.
//!
//! Exit-code policy follows the commands themselves: most accept only 0;
//! the remote and merge commands also accept 1 as a non-fatal "nothing
//! changed" outcome; `rollback` reports any exit as a success flag.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDateTime;
use log::info;

use crate::args::Argv;
use crate::client::HgClient;
use crate::errors::*;
use crate::parse::lists::{self, Bookmark, BranchHead, TagEntry};
use crate::parse::status::{self, FileStatus};
use crate::parse::xmllog::{self, Revision};
use crate::parse::kv;
use crate::server::CommandOutput;

const OK: &[i32] = &[0];
const OK_OR_NOTHING: &[i32] = &[0, 1];

/// Argument value of `archive --type`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArchiveType {
    /// Let the server infer the type from the destination name.
    Default,
    /// A directory of files.
    Directory,
    Tar,
    TarBzip2,
    TarGzip,
    UncompressedZip,
    Zip,
}

impl ArchiveType {
    fn as_arg(&self) -> &'static str {
        match self {
            ArchiveType::Default => "",
            ArchiveType::Directory => "files",
            ArchiveType::Tar => "tar",
            ArchiveType::TarBzip2 => "tbz2",
            ArchiveType::TarGzip => "tgz",
            ArchiveType::UncompressedZip => "uzip",
            ArchiveType::Zip => "zip",
        }
    }
}

impl Default for ArchiveType {
    fn default() -> Self {
        ArchiveType::Default
    }
}

#[derive(Clone, Debug, Default)]
pub struct RevertOptions {
    pub revision: String,
    pub all: bool,
    pub no_backup: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AnnotateOptions {
    pub revision: String,
    pub user: bool,
    pub number: bool,
    pub changeset: bool,
    pub date: bool,
    pub text: bool,
}

#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    pub revisions: Vec<String>,
    pub change: String,
    pub git: bool,
    pub ignore_all_space: bool,
    pub reverse: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    pub kind: ArchiveType,
    pub revision: String,
    pub prefix: String,
    pub no_decode: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    pub add_remove: bool,
    pub close_branch: bool,
    pub date: Option<NaiveDateTime>,
    pub user: String,
}

#[derive(Clone, Debug, Default)]
pub struct MergeOptions {
    pub force: bool,
    pub tool: String,
}

#[derive(Clone, Debug, Default)]
pub struct PullOptions {
    pub update: bool,
    pub force: bool,
    pub revisions: Vec<String>,
    pub branches: Vec<String>,
    pub bookmarks: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PushOptions {
    pub force: bool,
    pub new_branch: bool,
    pub revisions: Vec<String>,
    pub branches: Vec<String>,
    pub bookmarks: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    pub revision: String,
    pub clean: bool,
    pub check: bool,
    pub date: Option<NaiveDateTime>,
}

/// Options shared by `incoming` and `outgoing`.
#[derive(Clone, Debug, Default)]
pub struct RemoteDiffOptions {
    /// Peer path or alias; empty means the default path.
    pub source: String,
    pub revisions: Vec<String>,
    pub branches: Vec<String>,
    pub force: bool,
    pub no_merges: bool,
    pub newest_first: bool,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    /// Revision set, passed as `--rev`.
    pub revrange: String,
    pub follow: bool,
    pub only_merges: bool,
    pub no_merges: bool,
    pub keyword: String,
    pub date: Option<NaiveDateTime>,
    pub branch: String,
    pub limit: Option<u32>,
    pub users: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct StatusOptions {
    /// States to report. `Default` selects the command's default set,
    /// `All` maps to `--all`, everything else to its own flag.
    pub include: Vec<FileStatus>,
    pub revision: String,
    pub change: String,
}

#[derive(Clone, Debug, Default)]
pub struct BookmarkOptions {
    pub revision: String,
    pub force: bool,
    pub delete: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TagOptions {
    pub revision: String,
    pub message: String,
    pub local: bool,
    pub force: bool,
    pub remove: bool,
}

/// Options for the one-shot `clone` invocation.
#[derive(Clone, Debug)]
pub struct CloneOptions {
    pub hg_binary: PathBuf,
    pub no_update: bool,
    pub uncompressed: bool,
    pub pull: bool,
    pub revisions: Vec<String>,
    pub branches: Vec<String>,
}

impl Default for CloneOptions {
    fn default() -> Self {
        CloneOptions {
            hg_binary: PathBuf::from("hg"),
            no_update: false,
            uncompressed: false,
            pull: false,
            revisions: Vec::new(),
            branches: Vec::new(),
        }
    }
}

impl HgClient {
    /// Schedule files for addition. An empty list adds all unknown files.
    pub fn add(&self, files: &[&str]) -> Result<()> {
        let mut argv = Argv::new("add");
        argv.extend(files.iter().copied());
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// Stop tracking the given files without deleting them.
    pub fn forget(&self, files: &[&str]) -> Result<()> {
        if files.is_empty() {
            return Err(ErrorKind::InvalidArgument("forget requires files").into());
        }
        let mut argv = Argv::new("forget");
        argv.extend(files.iter().copied());
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// Schedule files for removal.
    pub fn remove(&self, files: &[&str]) -> Result<()> {
        if files.is_empty() {
            return Err(ErrorKind::InvalidArgument("remove requires files").into());
        }
        let mut argv = Argv::new("remove");
        argv.extend(files.iter().copied());
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// Restore files to their checked-out state.
    pub fn revert(&self, files: &[&str], options: &RevertOptions) -> Result<()> {
        let mut argv = Argv::new("revert");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.flag_if(options.all, "--all");
        argv.flag_if(options.no_backup, "--no-backup");
        argv.extend(files.iter().copied());
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// Rename a tracked file, carrying its history.
    pub fn rename(&self, source: &str, destination: &str) -> Result<()> {
        let mut argv = Argv::new("rename");
        argv.push(source);
        argv.push(destination);
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// The patch text of the given revisions.
    pub fn export(&self, revisions: &[&str]) -> Result<String> {
        if revisions.is_empty() {
            return Err(ErrorKind::InvalidArgument("export requires revisions").into());
        }
        let mut argv = Argv::new("export");
        argv.extend(revisions.iter().copied());
        Ok(self.run_checked(argv.as_slice(), OK)?.stdout)
    }

    /// Per-line origin information for one file.
    pub fn annotate(&self, file: &str, options: &AnnotateOptions) -> Result<String> {
        let mut argv = Argv::new("annotate");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.flag_if(options.user, "--user");
        argv.flag_if(options.number, "--number");
        argv.flag_if(options.changeset, "--changeset");
        argv.flag_if(options.date, "--date");
        argv.flag_if(options.text, "--text");
        argv.push(file);
        Ok(self.run_checked(argv.as_slice(), OK)?.stdout)
    }

    /// Unified diff text; empty `files` diffs the whole working copy.
    pub fn diff(&self, files: &[&str], options: &DiffOptions) -> Result<String> {
        let mut argv = Argv::new("diff");
        argv.pairs_if_nonempty("--rev", &options.revisions);
        argv.pair_if_nonempty("--change", &options.change);
        argv.flag_if(options.git, "--git");
        argv.flag_if(options.ignore_all_space, "--ignore-all-space");
        argv.flag_if(options.reverse, "--reverse");
        argv.extend(files.iter().copied());
        Ok(self.run_checked(argv.as_slice(), OK)?.stdout)
    }

    /// Write an unversioned snapshot of a revision to `destination`.
    pub fn archive(&self, destination: &str, options: &ArchiveOptions) -> Result<()> {
        if destination.is_empty() {
            return Err(ErrorKind::InvalidArgument("archive requires a destination").into());
        }
        let mut argv = Argv::new("archive");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.pair_if_nonempty("--type", options.kind.as_arg());
        argv.pair_if_nonempty("--prefix", &options.prefix);
        argv.flag_if(options.no_decode, "--no-decode");
        argv.push(destination);
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// File contents at a revision, one server invocation per file.
    pub fn cat(&self, files: &[&str], revision: Option<&str>) -> Result<HashMap<String, String>> {
        if files.is_empty() {
            return Err(ErrorKind::InvalidArgument("cat requires files").into());
        }
        let mut contents = HashMap::new();
        for file in files {
            let mut argv = Argv::new("cat");
            if let Some(revision) = revision {
                argv.pair_if_nonempty("--rev", revision);
            }
            argv.push(*file);
            let output = self.run_checked(argv.as_slice(), OK)?;
            contents.insert((*file).to_string(), output.stdout);
        }
        Ok(contents)
    }

    /// The working-directory summary text.
    pub fn summary(&self) -> Result<String> {
        Ok(self.run_checked(Argv::new("summary").as_slice(), OK)?.stdout)
    }

    /// Commit outstanding changes. Returns false when there was nothing
    /// to commit.
    pub fn commit(&self, message: &str, options: &CommitOptions) -> Result<bool> {
        let mut argv = Argv::new("commit");
        argv.pair("--message", message);
        argv.flag_if(options.add_remove, "--addremove");
        argv.flag_if(options.close_branch, "--close-branch");
        argv.date_if("--date", options.date.as_ref());
        argv.pair_if_nonempty("--user", &options.user);
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        Ok(output.exit_code == 0)
    }

    /// Merge a revision into the working directory. Returns false when
    /// files are left unresolved.
    pub fn merge(&self, revision: Option<&str>, options: &MergeOptions) -> Result<bool> {
        let mut argv = Argv::new("merge");
        argv.flag_if(options.force, "--force");
        argv.pair_if_nonempty("--tool", &options.tool);
        if let Some(revision) = revision {
            argv.pair_if_nonempty("--rev", revision);
        }
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        Ok(output.exit_code == 0)
    }

    /// Pull from a peer. Returns false when an `--update` left unresolved
    /// files behind.
    pub fn pull(&self, source: Option<&str>, options: &PullOptions) -> Result<bool> {
        let mut argv = Argv::new("pull");
        argv.flag_if(options.update, "--update");
        argv.flag_if(options.force, "--force");
        argv.pairs_if_nonempty("--rev", &options.revisions);
        argv.pairs_if_nonempty("--branch", &options.branches);
        argv.pairs_if_nonempty("--bookmark", &options.bookmarks);
        if let Some(source) = source {
            argv.push(source);
        }
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        Ok(output.exit_code == 0)
    }

    /// Push to a peer. Returns false when there was nothing to push.
    pub fn push(&self, destination: Option<&str>, options: &PushOptions) -> Result<bool> {
        let mut argv = Argv::new("push");
        argv.flag_if(options.force, "--force");
        argv.flag_if(options.new_branch, "--new-branch");
        argv.pairs_if_nonempty("--rev", &options.revisions);
        argv.pairs_if_nonempty("--branch", &options.branches);
        argv.pairs_if_nonempty("--bookmark", &options.bookmarks);
        if let Some(destination) = destination {
            argv.push(destination);
        }
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        Ok(output.exit_code == 0)
    }

    /// Update the working directory. Returns false when unresolved files
    /// remain.
    pub fn update(&self, options: &UpdateOptions) -> Result<bool> {
        let mut argv = Argv::new("update");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.flag_if(options.clean, "--clean");
        argv.flag_if(options.check, "--check");
        argv.date_if("--date", options.date.as_ref());
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        Ok(output.exit_code == 0)
    }

    /// Changesets a pull would bring in; empty when the peer has nothing
    /// new.
    pub fn incoming(&self, options: &RemoteDiffOptions) -> Result<Vec<Revision>> {
        let mut argv = Argv::new_xml("incoming");
        remote_diff_args(&mut argv, options);
        let output = self.run_checked(argv.as_slice(), OK_OR_NOTHING)?;
        if output.exit_code == 1 {
            return Ok(Vec::new());
        }
        xmllog::parse(&output.stdout)
    }

    /// Changesets a push would send.
    pub fn outgoing(&self, options: &RemoteDiffOptions) -> Result<Vec<Revision>> {
        let mut argv = Argv::new_xml("outgoing");
        remote_diff_args(&mut argv, options);
        let output = self.run_checked(argv.as_slice(), OK)?;
        xmllog::parse(&output.stdout)
    }

    /// Repository head changesets; empty for a fresh repository.
    pub fn heads(&self) -> Result<Vec<Revision>> {
        let output = self.run_checked(Argv::new_xml("heads").as_slice(), OK_OR_NOTHING)?;
        if output.exit_code == 1 {
            return Ok(Vec::new());
        }
        xmllog::parse(&output.stdout)
    }

    /// Undo the last transaction. Returns whether anything was rolled
    /// back; never fails on the exit code.
    pub fn rollback(&self) -> Result<bool> {
        let output = self.get_command_output(&["rollback"])?;
        Ok(output.exit_code == 0)
    }

    /// Working-directory file states.
    pub fn status(&self, options: &StatusOptions) -> Result<HashMap<String, FileStatus>> {
        let mut argv = Argv::new("status");
        for state in &options.include {
            if let Some(flag) = state.as_filter_flag() {
                argv.push(flag);
            }
        }
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.pair_if_nonempty("--change", &options.change);
        let output = self.run_checked(argv.as_slice(), OK)?;
        Ok(status::parse(&output.stdout))
    }

    /// Revision history, newest first, optionally restricted to `files`.
    pub fn log(&self, files: &[&str], options: &LogOptions) -> Result<Vec<Revision>> {
        let mut argv = Argv::new_xml("log");
        argv.pair_if_nonempty("--rev", &options.revrange);
        argv.flag_if(options.follow, "--follow");
        argv.flag_if(options.only_merges, "--only-merges");
        argv.flag_if(options.no_merges, "--no-merges");
        argv.pair_if_nonempty("--keyword", &options.keyword);
        argv.date_if("--date", options.date.as_ref());
        argv.pair_if_nonempty("--branch", &options.branch);
        if let Some(limit) = options.limit {
            argv.pair("--limit", limit.to_string());
        }
        argv.pairs_if_nonempty("--user", &options.users);
        argv.extend(files.iter().copied());
        let output = self.run_checked(argv.as_slice(), OK)?;
        xmllog::parse(&output.stdout)
    }

    /// Parents of the working directory or of `revision`, optionally for
    /// one file.
    pub fn parents(&self, file: Option<&str>, revision: Option<&str>) -> Result<Vec<Revision>> {
        let mut argv = Argv::new_xml("parents");
        if let Some(revision) = revision {
            argv.pair_if_nonempty("--rev", revision);
        }
        if let Some(file) = file {
            argv.push(file);
        }
        let output = self.run_checked(argv.as_slice(), OK)?;
        xmllog::parse(&output.stdout)
    }

    /// Configured peer paths as an alias → url map.
    pub fn paths(&self) -> Result<HashMap<String, String>> {
        let output = self.run_checked(Argv::new("paths").as_slice(), OK)?;
        Ok(kv::parse(&output.stdout, &["="]))
    }

    /// Effective configuration entries, optionally filtered to the given
    /// section or entry names.
    pub fn showconfig(&self, names: &[&str]) -> Result<HashMap<String, String>> {
        let mut argv = Argv::new("showconfig");
        argv.extend(names.iter().copied());
        let output = self.run_checked(argv.as_slice(), OK)?;
        Ok(kv::parse(&output.stdout, &["="]))
    }

    /// Merge state of conflicted files: path → resolved.
    pub fn resolve_list(&self) -> Result<HashMap<String, bool>> {
        let mut argv = Argv::new("resolve");
        argv.push("--list");
        let output = self.run_checked(argv.as_slice(), OK)?;
        Ok(lists::parse_resolve(&output.stdout))
    }

    /// The most recent changeset.
    pub fn tip(&self) -> Result<Revision> {
        let output = self.run_checked(Argv::new_xml("tip").as_slice(), OK)?;
        xmllog::parse(&output.stdout)?
            .into_iter()
            .next()
            .ok_or_else(|| ErrorKind::Parse("tip produced no log entry".into()).into())
    }

    /// Name of the working directory's branch.
    pub fn branch(&self) -> Result<String> {
        let output = self.run_checked(Argv::new("branch").as_slice(), OK)?;
        Ok(output.stdout.trim_end().to_string())
    }

    /// Mark the working directory as being on a new branch.
    pub fn set_branch(&self, name: &str, force: bool) -> Result<()> {
        let mut argv = Argv::new("branch");
        argv.flag_if(force, "--force");
        argv.push(name);
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// Open branch heads.
    pub fn branches(&self) -> Result<Vec<BranchHead>> {
        let output = self.run_checked(Argv::new("branches").as_slice(), OK)?;
        Ok(lists::parse_branches(&output.stdout))
    }

    /// Set or delete a bookmark.
    pub fn bookmark(&self, name: &str, options: &BookmarkOptions) -> Result<()> {
        let mut argv = Argv::new("bookmark");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.flag_if(options.force, "--force");
        argv.flag_if(options.delete, "--delete");
        argv.push(name);
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// All bookmarks.
    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        let output = self.run_checked(Argv::new("bookmarks").as_slice(), OK)?;
        Ok(lists::parse_bookmarks(&output.stdout))
    }

    /// Add or remove a tag.
    pub fn tag(&self, name: &str, options: &TagOptions) -> Result<()> {
        let mut argv = Argv::new("tag");
        argv.pair_if_nonempty("--rev", &options.revision);
        argv.pair_if_nonempty("--message", &options.message);
        argv.flag_if(options.local, "--local");
        argv.flag_if(options.force, "--force");
        argv.flag_if(options.remove, "--remove");
        argv.push(name);
        self.run_checked(argv.as_slice(), OK)?;
        Ok(())
    }

    /// All tags, including `tip`.
    pub fn tags(&self) -> Result<Vec<TagEntry>> {
        let output = self.run_checked(Argv::new("tags").as_slice(), OK)?;
        Ok(lists::parse_tags(&output.stdout))
    }

    /// Clone a repository with a transient `hg clone`; does not use a
    /// command server.
    pub fn clone_repo(
        source: &str,
        destination: Option<&str>,
        options: &CloneOptions,
    ) -> Result<()> {
        if source.is_empty() {
            return Err(ErrorKind::InvalidArgument("clone requires a source").into());
        }
        let mut argv = Argv::new("clone");
        argv.flag_if(options.no_update, "--noupdate");
        argv.flag_if(options.uncompressed, "--uncompressed");
        argv.flag_if(options.pull, "--pull");
        argv.pairs_if_nonempty("--rev", &options.revisions);
        argv.pairs_if_nonempty("--branch", &options.branches);
        argv.push(source);
        if let Some(destination) = destination {
            argv.push(destination);
        }
        run_one_shot(&options.hg_binary, argv)
    }
}

fn remote_diff_args(argv: &mut Argv, options: &RemoteDiffOptions) {
    argv.flag_if(options.force, "--force");
    argv.flag_if(options.no_merges, "--no-merges");
    argv.flag_if(options.newest_first, "--newest-first");
    argv.pairs_if_nonempty("--rev", &options.revisions);
    argv.pairs_if_nonempty("--branch", &options.branches);
    if let Some(limit) = options.limit {
        argv.pair("--limit", limit.to_string());
    }
    if !options.source.is_empty() {
        argv.push(options.source.as_str());
    }
}

/// Run a transient `hg` process to completion. Non-zero exit surfaces as
/// `CommandFailed` carrying the combined output.
fn run_one_shot(hg_binary: &Path, argv: Argv) -> Result<()> {
    info!("one-shot invocation: {:?}", argv.as_slice());
    let output = Command::new(hg_binary)
        .args(argv.as_slice())
        .output()
        .map_err(|err| ErrorKind::ServerLaunchFailed(err.to_string()))?;
    if !output.status.success() {
        return Err(ErrorKind::CommandFailed(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use maplit::hashmap;

    use super::*;
    use crate::client::testutil::{request_bytes, test_client};
    use crate::server::testing::response;

    #[test]
    fn status_happy_path() {
        let (client, written) = test_client(response(b"M file1.txt\n? file2.txt\n", b"", 0));
        let statuses = client.status(&StatusOptions::default()).unwrap();
        assert_eq!(
            statuses,
            hashmap! {
                "file1.txt".to_string() => FileStatus::Modified,
                "file2.txt".to_string() => FileStatus::Unknown,
            }
        );
        assert_eq!(written.bytes(), request_bytes(&["status"]));
    }

    #[test]
    fn status_filters_map_to_flags() {
        let (client, written) = test_client(response(b"", b"", 0));
        let options = StatusOptions {
            include: vec![FileStatus::All, FileStatus::Default, FileStatus::Missing],
            ..Default::default()
        };
        client.status(&options).unwrap();
        assert_eq!(
            written.bytes(),
            request_bytes(&["status", "--all", "--deleted"])
        );
    }

    #[test]
    fn commit_with_nothing_to_commit() {
        let (client, written) = test_client(response(b"", b"nothing changed\n", 1));
        let committed = client.commit("change", &CommitOptions::default()).unwrap();
        assert!(!committed);
        assert_eq!(
            written.bytes(),
            request_bytes(&["commit", "--message", "change"])
        );
    }

    #[test]
    fn commit_rejects_fatal_exit_codes() {
        let (client, _written) = test_client(response(b"", b"abort: bad\n", 255));
        let err = client
            .commit("change", &CommitOptions::default())
            .unwrap_err();
        match err.downcast_ref::<ErrorKind>() {
            Some(ErrorKind::CommandFailed(output)) => assert_eq!(output.exit_code, 255),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn commit_argv_carries_options() {
        let (client, written) = test_client(response(b"", b"", 0));
        let options = CommitOptions {
            add_remove: true,
            user: "alice".to_string(),
            ..Default::default()
        };
        assert!(client.commit("msg", &options).unwrap());
        assert_eq!(
            written.bytes(),
            request_bytes(&[
                "commit",
                "--message",
                "msg",
                "--addremove",
                "--user",
                "alice"
            ])
        );
    }

    #[test]
    fn log_parses_revisions() {
        let xml = br#"<?xml version="1.0"?>
<log>
<logentry revision="3" node="abcdef0123456789abcdef0123456789abcdef01">
<author email="x@y">Name</author>
<date>2023-01-02T03:04:05+00:00</date>
<msg>m</msg>
<branch>default</branch>
</logentry>
</log>
"#;
        let (client, written) = test_client(response(xml, b"", 0));
        let revisions = client.log(&[], &LogOptions::default()).unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].revision_id, "3");
        assert_eq!(revisions[0].branch.as_deref(), Some("default"));
        assert_eq!(written.bytes(), request_bytes(&["log", "--style", "xml"]));
    }

    #[test]
    fn log_argv_carries_options() {
        let (client, written) = test_client(response(
            br#"<?xml version="1.0"?><log></log>"#,
            b"",
            0,
        ));
        let options = LogOptions {
            revrange: "1::".to_string(),
            follow: true,
            limit: Some(10),
            ..Default::default()
        };
        client.log(&["src/main.rs"], &options).unwrap();
        assert_eq!(
            written.bytes(),
            request_bytes(&[
                "log",
                "--style",
                "xml",
                "--rev",
                "1::",
                "--follow",
                "--limit",
                "10",
                "src/main.rs"
            ])
        );
    }

    #[test]
    fn incoming_with_no_changes_is_empty() {
        let (client, _written) = test_client(response(
            b"comparing with /peer\nsearching for changes\nno changes found\n",
            b"",
            1,
        ));
        let revisions = client.incoming(&RemoteDiffOptions::default()).unwrap();
        assert!(revisions.is_empty());
    }

    #[test]
    fn heads_on_empty_repository() {
        let (client, _written) = test_client(response(b"", b"", 1));
        assert!(client.heads().unwrap().is_empty());
    }

    #[test]
    fn rollback_reports_flag_for_any_exit() {
        let (client, _written) = test_client(response(b"no rollback information\n", b"", 1));
        assert!(!client.rollback().unwrap());
    }

    #[test]
    fn cat_invokes_once_per_file() {
        let mut responses = response(b"first contents", b"", 0);
        responses.extend(response(b"second contents", b"", 0));
        let (client, written) = test_client(responses);
        let contents = client.cat(&["a.txt", "b.txt"], Some("2")).unwrap();
        assert_eq!(
            contents,
            hashmap! {
                "a.txt".to_string() => "first contents".to_string(),
                "b.txt".to_string() => "second contents".to_string(),
            }
        );
        let mut expected = request_bytes(&["cat", "--rev", "2", "a.txt"]);
        expected.extend(request_bytes(&["cat", "--rev", "2", "b.txt"]));
        assert_eq!(written.bytes(), expected);
    }

    #[test]
    fn empty_file_lists_are_rejected() {
        let (client, _written) = test_client(Vec::new());
        for err in vec![
            client.cat(&[], None).unwrap_err(),
            client.forget(&[]).unwrap_err(),
            client.remove(&[]).unwrap_err(),
            client.export(&[]).unwrap_err(),
            client.archive("", &ArchiveOptions::default()).unwrap_err(),
        ] {
            assert_matches!(
                err.downcast_ref::<ErrorKind>(),
                Some(ErrorKind::InvalidArgument(..))
            );
        }
    }

    #[test]
    fn archive_argv_maps_type() {
        let (client, written) = test_client(response(b"", b"", 0));
        let options = ArchiveOptions {
            kind: ArchiveType::TarGzip,
            revision: "tip".to_string(),
            ..Default::default()
        };
        client.archive("out.tgz", &options).unwrap();
        assert_eq!(
            written.bytes(),
            request_bytes(&["archive", "--rev", "tip", "--type", "tgz", "out.tgz"])
        );
    }

    #[test]
    fn default_archive_type_adds_no_flag() {
        let (client, written) = test_client(response(b"", b"", 0));
        client.archive("out", &ArchiveOptions::default()).unwrap();
        assert_eq!(written.bytes(), request_bytes(&["archive", "out"]));
    }

    #[test]
    fn paths_are_parsed() {
        let (client, _written) = test_client(response(
            b"default = https://example.com/repo\nupstream = ssh://hg/repo\n",
            b"",
            0,
        ));
        assert_eq!(
            client.paths().unwrap(),
            hashmap! {
                "default".to_string() => "https://example.com/repo".to_string(),
                "upstream".to_string() => "ssh://hg/repo".to_string(),
            }
        );
    }

    #[test]
    fn resolve_listing() {
        let (client, written) = test_client(response(b"R done.txt\nU pending.txt\n", b"", 0));
        assert_eq!(
            client.resolve_list().unwrap(),
            hashmap! {
                "done.txt".to_string() => true,
                "pending.txt".to_string() => false,
            }
        );
        assert_eq!(written.bytes(), request_bytes(&["resolve", "--list"]));
    }

    #[test]
    fn branch_is_trimmed() {
        let (client, _written) = test_client(response(b"default\n", b"", 0));
        assert_eq!(client.branch().unwrap(), "default");
    }

    #[test]
    fn bookmarks_listing() {
        let (client, _written) = test_client(response(
            b" * work                      5:abc123def456\n",
            b"",
            0,
        ));
        let bookmarks = client.bookmarks().unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].name, "work");
        assert!(bookmarks[0].active);
    }

    #[test]
    fn tip_requires_an_entry() {
        let (client, _written) = test_client(response(
            br#"<?xml version="1.0"?><log></log>"#,
            b"",
            0,
        ));
        let err = client.tip().unwrap_err();
        assert_matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::Parse(..)));
    }

    #[test]
    fn pull_argv_carries_options() {
        let (client, written) = test_client(response(b"", b"", 0));
        let options = PullOptions {
            update: true,
            revisions: vec!["tip".to_string()],
            ..Default::default()
        };
        assert!(client.pull(Some("upstream"), &options).unwrap());
        assert_eq!(
            written.bytes(),
            request_bytes(&["pull", "--update", "--rev", "tip", "upstream"])
        );
    }
}
