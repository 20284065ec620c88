/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible during de-filtering
use alloc::boxed::Box;
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use crate::enums::PngColor;

/// Where in the filtered stream a failing row starts
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RowPosition {
    /// Interlace pass, always `0` for non-interlaced images
    pub pass:   usize,
    /// Row index inside the pass
    pub row:    usize,
    /// Byte offset of the row's filter tag from the start of the stream
    pub offset: usize
}

/// Possible errors that may occur during de-filtering
pub enum DefilterErrors {
    /// The filter tag of a row is not one of the five defined filters
    InvalidFilterType(u8),
    /// A row or its previous row does not have the expected length
    RowLengthMismatch { expected: usize, found: usize },
    /// The stream ended before a full row could be read
    ///
    /// `expected` is the number of bytes the record needs and `found`
    /// the bytes that were actually available
    TruncatedStream { expected: usize, found: usize },
    /// Bytes remain in the stream after the last row, only
    /// raised in strict mode
    TrailingData(usize),
    /// Bytes per pixel must be at least one
    InvalidBytesPerPixel(usize),
    /// Bit depth is not one of 1,2,4,8 or 16
    UnsupportedDepth(u8),
    /// Channel count is not in `1..=4`
    UnsupportedChannels(u8),
    /// The bit depth is not allowed for the colour type
    UnsupportedColorDepth(PngColor, u8),
    /// Width or height is zero
    ZeroDimensions,
    /// Image dimension is larger than what the options allow
    ///
    /// # Arguments
    /// - dimension name
    /// - the configured maximum
    /// - the image value
    TooLargeDimensions(&'static str, usize, usize),
    /// The output buffer cannot hold the decoded image
    TooSmallOutput { expected: usize, found: usize },
    /// The input given to the encoder does not match the geometry
    InsufficientData { expected: usize, found: usize },
    /// Geometry arithmetic overflowed `usize`
    Overflow,
    /// Generic message does not need heap allocation
    GenericStatic(&'static str),
    /// Generic message
    Generic(String),
    /// An error raised while decoding a specific row
    AtRow {
        position: RowPosition,
        error:    Box<DefilterErrors>
    },
    #[cfg(feature = "std")]
    IoErrors(std::io::Error)
}

impl DefilterErrors {
    /// Attach a row position to an error
    pub(crate) fn at(self, position: RowPosition) -> DefilterErrors {
        DefilterErrors::AtRow {
            position,
            error: Box::new(self)
        }
    }

    /// Return the underlying error, skipping any row position wrappers
    pub fn root(&self) -> &DefilterErrors {
        match self {
            DefilterErrors::AtRow { error, .. } => error.root(),
            err => err
        }
    }

    /// Return the position of the row which failed if known
    pub fn position(&self) -> Option<RowPosition> {
        match self {
            DefilterErrors::AtRow { position, .. } => Some(*position),
            _ => None
        }
    }
}

impl Debug for DefilterErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidFilterType(filter) => {
                writeln!(f, "Invalid filter type {filter}, expected a value in 0..=4")
            }
            Self::RowLengthMismatch { expected, found } => {
                writeln!(f, "Row length mismatch, expected {expected} bytes but found {found}")
            }
            Self::TruncatedStream { expected, found } => {
                writeln!(
                    f,
                    "Truncated stream, row needs {expected} bytes but only {found} remain"
                )
            }
            Self::TrailingData(count) => {
                writeln!(f, "Stream has at least {count} extra bytes after the last row")
            }
            Self::InvalidBytesPerPixel(bpp) => {
                writeln!(f, "Invalid bytes per pixel {bpp}, must be at least 1")
            }
            Self::UnsupportedDepth(depth) => {
                writeln!(f, "Unsupported bit depth {depth}, expected one of 1,2,4,8,16")
            }
            Self::UnsupportedChannels(channels) => {
                writeln!(f, "Unsupported channel count {channels}, expected 1 to 4")
            }
            Self::UnsupportedColorDepth(color, depth) => {
                writeln!(f, "Bit depth {depth} is not allowed for {color:?} images")
            }
            Self::ZeroDimensions => {
                writeln!(f, "Image width and height must be non-zero")
            }
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large {dimension}, maximum configured is {expected} but image has {found}"
                )
            }
            Self::TooSmallOutput { expected, found } => {
                writeln!(
                    f,
                    "Too small output size, expected {expected}, but found {found}"
                )
            }
            Self::InsufficientData { expected, found } => {
                writeln!(f, "Expected {expected} bytes of pixels but found {found}")
            }
            Self::Overflow => writeln!(f, "Image geometry overflows usize"),
            Self::GenericStatic(val) => writeln!(f, "{val}"),
            Self::Generic(val) => writeln!(f, "{val}"),
            Self::AtRow { position, error } => {
                write!(
                    f,
                    "Pass {}, row {} (stream offset {}): {:?}",
                    position.pass, position.row, position.offset, error
                )
            }
            #[cfg(feature = "std")]
            Self::IoErrors(err) => writeln!(f, "I/O error {err:?}")
        }
    }
}

impl Display for DefilterErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DefilterErrors {}

impl From<&'static str> for DefilterErrors {
    fn from(val: &'static str) -> Self {
        Self::GenericStatic(val)
    }
}

impl From<String> for DefilterErrors {
    fn from(val: String) -> Self {
        Self::Generic(val)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for DefilterErrors {
    fn from(val: std::io::Error) -> Self {
        Self::IoErrors(val)
    }
}
