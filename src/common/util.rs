use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;

use crate::common::error::{InspectError, Result};

/// An opened file, either memory-mapped or read through a buffer.
#[derive(Debug)]
pub enum FileSource {
    Mapped(Cursor<Mmap>),
    Buffered(BufReader<File>),
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileSource::Mapped(c) => c.read(buf),
            FileSource::Buffered(r) => r.read(buf),
        }
    }
}

impl Seek for FileSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            FileSource::Mapped(c) => c.seek(pos),
            FileSource::Buffered(r) => r.seek(pos),
        }
    }
}

/// Open a file for read-only access.
pub fn open_ro(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| InspectError::from_open(path, e))
}

/// Open a file as a byte source. Mapping falls back to buffered reads when
/// the file is empty or the platform refuses the map.
pub fn open_source(path: &Path, map_file: bool) -> Result<FileSource> {
    let file = open_ro(path)?;
    if map_file && file.metadata()?.len() > 0 {
        // SAFETY: the map is read-only and dropped with the source at the end
        // of the analysis call.
        match unsafe { Mmap::map(&file) } {
            Ok(map) => return Ok(FileSource::Mapped(Cursor::new(map))),
            Err(e) => {
                log::debug!("mmap of {} failed ({}), using buffered reads", path.display(), e)
            }
        }
    }
    Ok(FileSource::Buffered(BufReader::new(file)))
}
