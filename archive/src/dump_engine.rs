use std::io;

use wire::RecoverOutcome;

use crate::worker::{
    exit_from_io_error, ArchiveEntry, ArchiveWorker, FileSource, ModuleCallbacks, ReadOutcome,
    WorkerExitCode, EXIT_ABORTED, EXIT_CONNECT_ERROR, EXIT_SUCCESS,
};

/// End-of-archive sentinel for the path-length prefix.
const END_MARKER: u32 = u32::MAX;

/// The legacy `dump` archive engine (`§4.6`). `archives.h` only documents
/// the `tar`/cpio xattr extension byte-for-byte; the plain dump record
/// layout isn't part of this design's scope beyond accepting `bu_type =
/// "dump"`, so this is a minimal length-prefixed framing rather than a
/// byte-exact rendition of 4.3BSD dump tapes.
pub struct DumpEngine {
    source: Option<Box<dyn FileSource>>,
}

impl DumpEngine {
    pub fn for_backup(source: Box<dyn FileSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn for_recover() -> Self {
        Self { source: None }
    }
}

impl ArchiveWorker for DumpEngine {
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
            if let Err(err) = write_record(params, &entry) {
                return exit_from_io_error(err);
            }
            if entry.is_directory {
                params.file_history_dir(&entry.path);
            } else {
                params.file_history_path(&entry.path, entry.contents.len() as u64);
            }
            let _ = params.dispatch(false);
        }
        if params.write(&END_MARKER.to_le_bytes()).is_err() {
            return EXIT_CONNECT_ERROR;
        }
        EXIT_SUCCESS
    }

    fn run_recover(&mut self, params: &mut dyn ModuleCallbacks) -> WorkerExitCode {
        loop {
            if params.abort_requested() {
                return EXIT_ABORTED;
            }
            let mut len_buf = [0u8; 4];
            match read_exact_via(params, &mut len_buf) {
                Ok(true) => {}
                Ok(false) => return EXIT_SUCCESS,
                Err(err) => return exit_from_io_error(err),
            }
            let path_len = u32::from_le_bytes(len_buf);
            if path_len == END_MARKER {
                return EXIT_SUCCESS;
            }

            let mut path_buf = vec![0u8; path_len as usize];
            if !matches!(read_exact_via(params, &mut path_buf), Ok(true)) {
                return EXIT_CONNECT_ERROR;
            }
            let path = String::from_utf8_lossy(&path_buf).into_owned();

            let mut meta = [0u8; 4 + 8 + 1 + 8];
            if !matches!(read_exact_via(params, &mut meta), Ok(true)) {
                return EXIT_CONNECT_ERROR;
            }
            let is_directory = meta[12] != 0;
            let size = u64::from_le_bytes(meta[13..21].try_into().unwrap());

            if !is_directory {
                let mut remaining = size;
                let mut buf = vec![0u8; 64 * 1024];
                while remaining > 0 {
                    let take = remaining.min(buf.len() as u64) as usize;
                    match read_exact_via(params, &mut buf[..take]) {
                        Ok(true) => {}
                        Ok(false) => return EXIT_CONNECT_ERROR,
                        Err(err) => return exit_from_io_error(err),
                    }
                    remaining -= take as u64;
                }
            }
            params.file_recovered(&path, RecoverOutcome::Successful);
        }
    }
}

fn write_record(params: &mut dyn ModuleCallbacks, entry: &ArchiveEntry) -> io::Result<()> {
    let path_bytes = entry.path.as_bytes();
    params.write(&(path_bytes.len() as u32).to_le_bytes())?;
    params.write(path_bytes)?;
    params.write(&entry.mode.to_le_bytes())?;
    params.write(&entry.mtime.to_le_bytes())?;
    params.write(&[u8::from(entry.is_directory)])?;
    params.write(&(entry.contents.len() as u64).to_le_bytes())?;
    if !entry.is_directory {
        params.write(&entry.contents)?;
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
    use crate::worker::InMemorySource;
    use std::collections::VecDeque;
    use wire::{LogSeverity, NameListEntry};

    struct FakeParams {
        out: Vec<u8>,
        input: VecDeque<u8>,
        recovered: Vec<(String, RecoverOutcome)>,
    }

    impl FakeParams {
        fn writer() -> Self {
            Self {
                out: Vec::new(),
                input: VecDeque::new(),
                recovered: Vec::new(),
            }
        }

        fn reader(data: Vec<u8>) -> Self {
            Self {
                out: Vec::new(),
                input: data.into(),
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
            false
        }
    }

    #[test]
    fn backup_then_recover_round_trips_one_file() {
        let entries = vec![ArchiveEntry::file("a.txt", 0o644, 0, b"dump me".to_vec())];
        let mut backup = DumpEngine::for_backup(Box::new(InMemorySource::new(entries)));
        let mut writer = FakeParams::writer();
        assert_eq!(backup.run_backup(&mut writer), EXIT_SUCCESS);

        let mut recover = DumpEngine::for_recover();
        let mut reader = FakeParams::reader(writer.out);
        assert_eq!(recover.run_recover(&mut reader), EXIT_SUCCESS);
        assert_eq!(reader.recovered, vec![("a.txt".to_string(), RecoverOutcome::Successful)]);
    }

    #[test]
    fn recover_stops_cleanly_at_end_marker() {
        let mut reader = FakeParams::reader(END_MARKER.to_le_bytes().to_vec());
        let mut recover = DumpEngine::for_recover();
        assert_eq!(recover.run_recover(&mut reader), EXIT_SUCCESS);
        assert!(reader.recovered.is_empty());
    }
}
