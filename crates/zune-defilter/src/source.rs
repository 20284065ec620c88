/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Upstream byte sources
//!
//! The decoder pulls `(filter tag, row)` records from anything
//! implementing [`ScanlineSource`], which is usually the output of an inflate
//! stage.

use crate::error::DefilterErrors;

/// The input trait implemented for filtered scanline sources
pub trait ScanlineSource {
    /// Read bytes into `buf`, filling it completely unless the
    /// stream ends first
    ///
    /// # Returns
    /// - `Ok(usize)`: Number of bytes written to `buf`, this is only smaller than
    ///   `buf.len()` when the end of the stream was reached
    /// - `Err()`: An unrecoverable error from the underlying reader
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, DefilterErrors>;

    /// Report whether the stream still has bytes left
    ///
    /// This is only called after the last row has been read, to detect trailing data.
    fn has_remaining(&mut self) -> Result<bool, DefilterErrors>;
}

impl ScanlineSource for &[u8] {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, DefilterErrors> {
        let size = buf.len().min(self.len());
        let (head, tail) = self.split_at(size);

        buf[..size].copy_from_slice(head);
        *self = tail;

        Ok(size)
    }

    fn has_remaining(&mut self) -> Result<bool, DefilterErrors> {
        Ok(!self.is_empty())
    }
}

/// A source wrapping anything implementing [`Read`](std::io::Read)
///
/// For in memory data, prefer passing a slice directly.
#[cfg(feature = "std")]
pub struct ReaderSource<R: std::io::Read> {
    inner:  R,
    // a byte peeked by `has_remaining`, handed out on the next read
    peeked: Option<u8>
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ReaderSource<R> {
    pub fn new(inner: R) -> ReaderSource<R> {
        ReaderSource {
            inner,
            peeked: None
        }
    }

    /// Return the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ScanlineSource for ReaderSource<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, DefilterErrors> {
        use std::io::ErrorKind;

        let mut filled = 0;

        if let Some(byte) = self.peeked {
            if buf.is_empty() {
                return Ok(0);
            }
            buf[0] = byte;
            self.peeked = None;
            filled = 1;
        }

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DefilterErrors::IoErrors(e))
            }
        }
        Ok(filled)
    }

    fn has_remaining(&mut self) -> Result<bool, DefilterErrors> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        let mut byte = [0];
        let read = loop {
            match self.inner.read(&mut byte) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DefilterErrors::IoErrors(e))
            }
        };
        if read == 0 {
            return Ok(false);
        }
        self.peeked = Some(byte[0]);
        Ok(true)
    }
}
