//! The archive-format streamer (`§4.6`, `§6`): the `ArchiveWorker` contract,
//! the `tar` and `dump` engines, and the byte-exact xattr header codec.
//!
//! Filesystem traversal and path restoration stay external collaborators
//! per `§1` — [`FileSource`] is the seam a real walker would implement for
//! backup; recover only ever reports [`worker::ModuleCallbacks::file_recovered`]
//! for names pulled out of the stream, never writes to a filesystem itself.

mod dump_engine;
mod tar;
mod tar_engine;
mod worker;
mod xattr;

pub use dump_engine::DumpEngine;
pub use tar::{TarHeader, BLOCK_SIZE};
pub use tar_engine::TarEngine;
pub use worker::{
    ArchiveEntry, ArchiveWorker, FileSource, InMemorySource, ModuleCallbacks, ReadOutcome,
    SeekOutcome, WorkerExitCode, EXIT_ABORTED, EXIT_CONNECT_ERROR, EXIT_SUCCESS,
};
pub use xattr::{XattrBuf, XattrHdr, HDR_LEN};
