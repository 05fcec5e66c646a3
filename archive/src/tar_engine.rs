use std::io;

use wire::RecoverOutcome;

use crate::tar::{self, TarHeader, BLOCK_SIZE};
use crate::worker::{
    exit_from_io_error, ArchiveWorker, FileSource, ModuleCallbacks, ReadOutcome, WorkerExitCode,
    EXIT_ABORTED, EXIT_CONNECT_ERROR, EXIT_SUCCESS,
};
use crate::xattr::{XattrBuf, XattrHdr};

/// The `tar` archive engine (`§4.6`, `§6`): POSIX ustar with the xattr
/// extension. One instance handles either a backup or a recover, never
/// both — `start_backup`/`start_recover` construct the right one.
pub struct TarEngine {
    source: Option<Box<dyn FileSource>>,
}

impl TarEngine {
    pub fn for_backup(source: Box<dyn FileSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn for_recover() -> Self {
        Self { source: None }
    }
}

impl ArchiveWorker for TarEngine {
    fn run_backup(&mut self, params: &mut dyn ModuleCallbacks) -> WorkerExitCode {
        let Some(source) = self.source.as_mut() else {
            return EXIT_CONNECT_ERROR;
        };
        loop {
            if params.abort_requested() {
                return EXIT_ABORTED;
            }
            let Some(entry) = source.next_entry() else {
                break;
            };
            if let Err(err) = write_entry(params, &entry) {
                return exit_from_io_error(err);
            }
            if entry.is_directory {
                params.file_history_dir(&entry.path);
            } else {
                params.file_history_path(&entry.path, entry.contents.len() as u64);
            }
            let _ = params.dispatch(false);
        }
        // Two all-zero blocks mark the end of the archive.
        if params.write(&[0u8; BLOCK_SIZE * 2]).is_err() {
            return EXIT_CONNECT_ERROR;
        }
        EXIT_SUCCESS
    }

    fn run_recover(&mut self, params: &mut dyn ModuleCallbacks) -> WorkerExitCode {
        loop {
            if params.abort_requested() {
                return EXIT_ABORTED;
            }
            let mut header_block = [0u8; BLOCK_SIZE];
            match read_exact_via(params, &mut header_block) {
                Ok(true) => {}
                Ok(false) => return EXIT_SUCCESS,
                Err(err) => return exit_from_io_error(err),
            }
            let Some(header) = TarHeader::decode(&header_block) else {
                return EXIT_SUCCESS;
            };
            let total = header.content_blocks() * BLOCK_SIZE as u64;
            let mut remaining = total;
            let mut buf = vec![0u8; BLOCK_SIZE];
            while remaining > 0 {
                let take = remaining.min(BLOCK_SIZE as u64) as usize;
                match read_exact_via(params, &mut buf[..take]) {
                    Ok(true) => {}
                    // Premature truncation mid-stream (`§7`: peer disconnect
                    // during remote recover) is a connect error, not success.
                    Ok(false) => return EXIT_CONNECT_ERROR,
                    Err(err) => return exit_from_io_error(err),
                }
                remaining -= take as u64;
            }
            if header.typeflag != tar::TYPEFLAG_XATTR {
                params.file_recovered(&header.name, RecoverOutcome::Successful);
            }
        }
    }
}

fn write_entry(params: &mut dyn ModuleCallbacks, entry: &crate::worker::ArchiveEntry) -> io::Result<()> {
    for (name, value) in &entry.xattrs {
        write_xattr(params, &entry.path, name, value)?;
    }

    let typeflag = if entry.is_directory {
        tar::TYPEFLAG_DIRECTORY
    } else {
        tar::TYPEFLAG_REGULAR
    };
    let size = if entry.is_directory {
        0
    } else {
        entry.contents.len() as u64
    };
    let header = TarHeader {
        name: entry.path.clone(),
        mode: entry.mode,
        uid: 0,
        gid: 0,
        size,
        mtime: entry.mtime,
        typeflag,
        linkname: String::new(),
    };
    params.write(&header.encode())?;
    if !entry.is_directory {
        params.write(&entry.contents)?;
        let padding = tar::padding_for(size);
        if padding > 0 {
            params.write(&vec![0u8; padding as usize])?;
        }
    }
    Ok(())
}

fn write_xattr(params: &mut dyn ModuleCallbacks, path: &str, name: &str, value: &[u8]) -> io::Result<()> {
    let xattr_buf = XattrBuf {
        typeflag: tar::TYPEFLAG_REGULAR,
        names: vec![path.to_string(), name.to_string()],
    };
    let encoded_buf = xattr_buf.encode();
    let xattr_hdr = XattrHdr {
        size: (crate::xattr::HDR_LEN + encoded_buf.len()) as u32,
        component_len: encoded_buf.len() as u32,
        link_component_len: 0,
    };
    let payload = [xattr_hdr.encode().to_vec(), encoded_buf].concat();

    let hdr_entry = TarHeader {
        name: format!("{path}/attr.hdr"),
        mode: 0,
        uid: 0,
        gid: 0,
        size: payload.len() as u64,
        mtime: 0,
        typeflag: tar::TYPEFLAG_XATTR,
        linkname: String::new(),
    };
    params.write(&hdr_entry.encode())?;
    params.write(&payload)?;
    let header_padding = tar::padding_for(payload.len() as u64);
    if header_padding > 0 {
        params.write(&vec![0u8; header_padding as usize])?;
    }

    let attr_entry = TarHeader {
        name: format!("{path}/attr."),
        mode: 0,
        uid: 0,
        gid: 0,
        size: value.len() as u64,
        mtime: 0,
        typeflag: tar::TYPEFLAG_XATTR,
        linkname: String::new(),
    };
    params.write(&attr_entry.encode())?;
    params.write(value)?;
    let value_padding = tar::padding_for(value.len() as u64);
    if value_padding > 0 {
        params.write(&vec![0u8; value_padding as usize])?;
    }
    Ok(())
}

fn read_exact_via(params: &mut dyn ModuleCallbacks, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match params.read(&mut buf[filled..])? {
            ReadOutcome::Eof => return Ok(false),
            ReadOutcome::Data(0) => return Ok(false),
            ReadOutcome::Data(n) => filled += n,
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{ArchiveEntry, InMemorySource};
    use std::collections::VecDeque;
    use wire::{LogSeverity, NameListEntry};

    /// An in-memory stand-in for the session callbacks, enough to drive the
    /// engine end to end without a real socket or tape.
    struct FakeParams {
        out: Vec<u8>,
        input: VecDeque<u8>,
        aborted: bool,
        recovered: Vec<(String, RecoverOutcome)>,
    }

    impl FakeParams {
        fn writer() -> Self {
            Self {
                out: Vec::new(),
                input: VecDeque::new(),
                aborted: false,
                recovered: Vec::new(),
            }
        }

        fn reader(data: Vec<u8>) -> Self {
            Self {
                out: Vec::new(),
                input: data.into(),
                aborted: false,
                recovered: Vec::new(),
            }
        }
    }

    impl ModuleCallbacks for FakeParams {
        fn get_env(&self, _name: &str) -> Option<String> {
            None
        }
        fn add_env(&mut self, _name: &str, _value: &str) {}
        fn set_env(&mut self, _name: &str, _value: &str) {}
        fn get_name(&self, _index: usize) -> Option<NameListEntry> {
            None
        }
        fn dispatch(&mut self, _blocking: bool) -> io::Result<()> {
            Ok(())
        }
        fn add_file_handler(
            &mut self,
            _fd: std::os::unix::io::RawFd,
            _interest: reactor::Interest,
            _callback: Box<dyn FnMut(reactor::Readiness) -> io::Result<reactor::HandlerOutcome> + Send>,
        ) -> io::Result<()> {
            Ok(())
        }
        fn remove_file_handler(&mut self, _fd: std::os::unix::io::RawFd) -> bool {
            false
        }
        fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
            if self.input.is_empty() {
                return Ok(ReadOutcome::Eof);
            }
            let n = buf.len().min(self.input.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.input.pop_front().unwrap();
            }
            Ok(ReadOutcome::Data(n))
        }
        fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            self.out.extend_from_slice(buf);
            Ok(())
        }
        fn seek(&mut self, _offset: u64, _length: u64) -> io::Result<crate::worker::SeekOutcome> {
            Ok(crate::worker::SeekOutcome::Ready)
        }
        fn file_recovered(&mut self, name: &str, outcome: RecoverOutcome) {
            self.recovered.push((name.to_string(), outcome));
        }
        fn log(&mut self, _severity: LogSeverity, _message_id: u32, _text: &str) {}
        fn abort_requested(&self) -> bool {
            self.aborted
        }
    }

    #[test]
    fn backup_writes_end_of_archive_marker() {
        let entries = vec![ArchiveEntry::file("a.txt", 0o644, 0, b"hello".to_vec())];
        let mut engine = TarEngine::for_backup(Box::new(InMemorySource::new(entries)));
        let mut params = FakeParams::writer();
        let code = engine.run_backup(&mut params);
        assert_eq!(code, EXIT_SUCCESS);
        assert!(params.out.len() >= BLOCK_SIZE * 2);
        let tail = &params.out[params.out.len() - BLOCK_SIZE * 2..];
        assert!(tail.iter().all(|&b| b == 0));
    }

    #[test]
    fn backup_then_recover_round_trips_one_file() {
        let entries = vec![ArchiveEntry::file("a.txt", 0o644, 0, b"hello world".to_vec())];
        let mut backup = TarEngine::for_backup(Box::new(InMemorySource::new(entries)));
        let mut writer = FakeParams::writer();
        assert_eq!(backup.run_backup(&mut writer), EXIT_SUCCESS);

        let mut recover = TarEngine::for_recover();
        let mut reader = FakeParams::reader(writer.out);
        let code = recover.run_recover(&mut reader);
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(reader.recovered, vec![("a.txt".to_string(), RecoverOutcome::Successful)]);
    }

    #[test]
    fn recover_reports_connect_error_on_truncated_stream() {
        let header = TarHeader::regular("big.bin", 4096, 0o644, 0);
        let mut stream = header.encode().to_vec();
        stream.extend_from_slice(&[0u8; 100]); // far short of the declared size
        let mut recover = TarEngine::for_recover();
        let mut reader = FakeParams::reader(stream);
        assert_eq!(recover.run_recover(&mut reader), EXIT_CONNECT_ERROR);
    }

    #[test]
    fn backup_honors_abort_request() {
        let entries = vec![
            ArchiveEntry::file("a.txt", 0o644, 0, b"1".to_vec()),
            ArchiveEntry::file("b.txt", 0o644, 0, b"2".to_vec()),
        ];
        let mut engine = TarEngine::for_backup(Box::new(InMemorySource::new(entries)));
        let mut params = FakeParams::writer();
        params.aborted = true;
        assert_eq!(engine.run_backup(&mut params), EXIT_ABORTED);
        assert!(params.out.is_empty());
    }
}
