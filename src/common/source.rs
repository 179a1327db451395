//! Seekable byte sources and scoped cursor handling.
//!
//! Every `Read + Seek` value is a [`ByteSource`]. Probes that peek at fixed
//! offsets borrow the source through a [`CursorGuard`], which puts the cursor
//! back where it found it when the guard goes out of scope.

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

use crate::common::error::Result;

/// A finite, seekable sequence of bytes with a read cursor.
pub trait ByteSource: Read + Seek {
    /// Current cursor offset from the start of the source.
    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    /// Total size of the source in bytes. The cursor is left untouched.
    fn length(&mut self) -> io::Result<u64> {
        let pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        if pos != len {
            self.seek(SeekFrom::Start(pos))?;
        }
        Ok(len)
    }

    /// Read into `buf` until it is full or the source is exhausted.
    /// Returns the number of bytes read; a short count means end of stream.
    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Read exactly `N` bytes, or `None` on a short read.
    fn read_array<const N: usize>(&mut self) -> io::Result<Option<[u8; N]>>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        if self.read_up_to(&mut buf)? == N {
            Ok(Some(buf))
        } else {
            Ok(None)
        }
    }

    /// Seek to `offset` and read exactly `N` bytes, or `None` on a short read.
    fn read_array_at<const N: usize>(&mut self, offset: u64) -> io::Result<Option<[u8; N]>>
    where
        Self: Sized,
    {
        self.seek(SeekFrom::Start(offset))?;
        self.read_array()
    }
}

impl<T: Read + Seek + ?Sized> ByteSource for T {}

/// Borrow of a source that restores the cursor on drop.
pub struct CursorGuard<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    origin: u64,
    armed: bool,
}

impl<'a, S: ByteSource + ?Sized> CursorGuard<'a, S> {
    pub fn new(source: &'a mut S) -> io::Result<Self> {
        let origin = source.position()?;
        Ok(CursorGuard {
            source,
            origin,
            armed: true,
        })
    }

    /// Offset the cursor will be returned to.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Restore the cursor now, reporting a failed seek instead of logging it.
    pub fn restore(mut self) -> io::Result<()> {
        self.armed = false;
        self.source.seek(SeekFrom::Start(self.origin))?;
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> Deref for CursorGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: ByteSource + ?Sized> DerefMut for CursorGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: ByteSource + ?Sized> Drop for CursorGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.source.seek(SeekFrom::Start(self.origin)) {
                log::warn!("failed to restore cursor to {}: {}", self.origin, e);
            }
        }
    }
}

/// Run `f` against `source` and put the cursor back afterwards,
/// whether `f` succeeds or fails.
pub fn probe<S, T, F>(source: &mut S, f: F) -> Result<T>
where
    S: ByteSource,
    F: FnOnce(&mut S) -> Result<T>,
{
    let mut guard = CursorGuard::new(source)?;
    let value = f(&mut *guard)?;
    guard.restore()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::InspectError;
    use std::io::Cursor;

    #[test]
    fn test_length_keeps_cursor() {
        let mut src = Cursor::new(vec![0u8; 64]);
        src.set_position(17);
        assert_eq!(ByteSource::length(&mut src).unwrap(), 64);
        assert_eq!(src.position(), 17);
    }

    #[test]
    fn test_read_up_to_short_read() {
        let mut src = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(src.read_up_to(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_read_array_at() {
        let mut src = Cursor::new(b"abcdefgh".to_vec());
        assert_eq!(src.read_array_at::<3>(2).unwrap(), Some(*b"cde"));
        assert_eq!(src.read_array_at::<4>(6).unwrap(), None);
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut src = Cursor::new(vec![0u8; 32]);
        src.set_position(5);
        {
            let mut guard = CursorGuard::new(&mut src).unwrap();
            guard.seek(SeekFrom::Start(30)).unwrap();
            assert_eq!(guard.origin(), 5);
        }
        assert_eq!(src.position(), 5);
    }

    #[test]
    fn test_probe_restores_on_error() {
        let mut src = Cursor::new(vec![0u8; 32]);
        src.set_position(9);
        let res: Result<()> = probe(&mut src, |s| {
            s.seek(SeekFrom::Start(20))?;
            Err(InspectError::NoAudioFrame)
        });
        assert!(matches!(res, Err(InspectError::NoAudioFrame)));
        assert_eq!(src.position(), 9);
    }
}
