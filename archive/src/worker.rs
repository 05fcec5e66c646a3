use std::io;
use std::os::unix::io::RawFd;

use reactor::{HandlerOutcome, Interest, Readiness};
use wire::{LogSeverity, NameListEntry, RecoverOutcome};

/// Outcome of one `read` callback (`§4.6`). A plain byte count plus an
/// explicit end-of-stream variant, rather than the source's `0 | -1 | 1`
/// sentinel trio — errors already flow through the `io::Result` the
/// callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    Eof,
}

/// Outcome of one `seek` callback (`§4.6`): either the window already
/// covers the new offset, or MOVER had to pause for the DMA to reposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    Ready,
    Paused,
}

/// The callback surface the core's `start_fn(params)` hands to an archive
/// worker (`§4.6`). Implemented by `daemon`, which closes over the live
/// session; the worker never touches `ndmp-core` types directly.
pub trait ModuleCallbacks: Send {
    fn get_env(&self, name: &str) -> Option<String>;
    fn add_env(&mut self, name: &str, value: &str);
    fn set_env(&mut self, name: &str, value: &str);
    fn get_name(&self, index: usize) -> Option<NameListEntry>;

    /// Gives time back to the reactor for the module's own fds
    /// (`class = MODULE`) during a long-running operation.
    fn dispatch(&mut self, blocking: bool) -> std::io::Result<()>;

    /// Registers `fd` with the reactor under the MODULE class so the next
    /// `dispatch` services it alongside whatever else the session's fds are
    /// doing. Mirrors `ndmpd_api_add_file_handler` in the original.
    fn add_file_handler(
        &mut self,
        fd: RawFd,
        interest: Interest,
        callback: Box<dyn FnMut(Readiness) -> io::Result<HandlerOutcome> + Send>,
    ) -> io::Result<()>;

    /// Mirrors `ndmpd_api_remove_file_handler`. Returns whether a handler
    /// for `fd` was actually registered.
    fn remove_file_handler(&mut self, fd: RawFd) -> bool;

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<ReadOutcome>;
    fn write(&mut self, buf: &[u8]) -> std::io::Result<()>;
    fn seek(&mut self, offset: u64, length: u64) -> std::io::Result<SeekOutcome>;

    /// Format-dependent file-history emission; populated only for backup
    /// and only for formats that emit the corresponding kind of node.
    fn file_history_path(&mut self, _path: &str, _size: u64) {}
    fn file_history_dir(&mut self, _path: &str) {}
    fn file_history_node(&mut self, _node: u64, _path: &str) {}

    fn file_recovered(&mut self, name: &str, outcome: RecoverOutcome);
    fn log(&mut self, severity: LogSeverity, message_id: u32, text: &str);

    fn abort_requested(&self) -> bool;
}

/// Terminal status an [`ArchiveWorker::run`] reports through `done(err)`
/// (`§4.3`, `§4.6`): `0` -> successful, `EINTR` -> aborted, `EIO` ->
/// connect error, anything else -> internal error. The worker returns the
/// raw code rather than a halt reason because the mapping belongs to the
/// core, which owns the halt-reason taxonomy.
pub type WorkerExitCode = i32;

pub const EXIT_SUCCESS: WorkerExitCode = 0;
pub const EXIT_ABORTED: WorkerExitCode = libc::EINTR;
pub const EXIT_CONNECT_ERROR: WorkerExitCode = libc::EIO;

/// Internal archive-engine error, logged before being folded into the
/// worker's raw exit code. The callback/engine boundary stays `io::Result`/
/// `WorkerExitCode` since that's what `wire::halt_reason_from_worker_errno`
/// expects; this type only exists to give the I/O failure a name worth
/// logging.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive stream I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Shared by `tar_engine`/`dump_engine`: logs the failure and folds it into
/// the one exit code both engines report for a failed read/write against
/// the data stream.
pub fn exit_from_io_error(err: io::Error) -> WorkerExitCode {
    let err = ArchiveError::from(err);
    tracing::warn!(%err, "archive engine I/O failure, halting with CONNECT_ERROR");
    EXIT_CONNECT_ERROR
}

/// One archive format engine (`§4.6`): `tar` or `dump`. Selected by
/// `bu_type` at `start_backup`/`start_recover` dispatch time and run on its
/// own thread, detached from the reactor.
pub trait ArchiveWorker: Send {
    fn run_backup(&mut self, params: &mut dyn ModuleCallbacks) -> WorkerExitCode;
    fn run_recover(&mut self, params: &mut dyn ModuleCallbacks) -> WorkerExitCode;
}

/// One filesystem entry an (external) traversal module hands to the backup
/// engine. Real directory walking is out of scope (`§1`); this is the seam
/// the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub mode: u32,
    pub mtime: u64,
    pub is_directory: bool,
    pub contents: Vec<u8>,
    pub xattrs: Vec<(String, Vec<u8>)>,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, mode: u32, mtime: u64, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            mode,
            mtime,
            is_directory: false,
            contents,
            xattrs: Vec::new(),
        }
    }

    pub fn directory(path: impl Into<String>, mode: u32, mtime: u64) -> Self {
        Self {
            path: path.into(),
            mode,
            mtime,
            is_directory: true,
            contents: Vec::new(),
            xattrs: Vec::new(),
        }
    }
}

/// Supplies entries to pack during backup. Real implementations walk a
/// filesystem; tests use an in-memory list.
pub trait FileSource: Send {
    fn next_entry(&mut self) -> Option<ArchiveEntry>;
}

/// A fixed, in-memory `FileSource`, mainly useful for tests and for the
/// `ndmpcopy` three-way case where entries are already materialized.
pub struct InMemorySource {
    entries: std::vec::IntoIter<ArchiveEntry>,
}

impl InMemorySource {
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl FileSource for InMemorySource {
    fn next_entry(&mut self) -> Option<ArchiveEntry> {
        self.entries.next()
    }
}
