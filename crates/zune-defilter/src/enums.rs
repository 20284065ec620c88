/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
#![allow(clippy::upper_case_acronyms)]

/// Per scanline filter types,
/// see https://www.w3.org/TR/2003/REC-PNG-20031110/#9Filter-types
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum FilterMethod {
    #[default]
    None,
    Sub,
    Up,
    Average,
    Paeth
}

impl FilterMethod {
    /// All filters, in tag order
    pub const ALL: [FilterMethod; 5] = [
        FilterMethod::None,
        FilterMethod::Sub,
        FilterMethod::Up,
        FilterMethod::Average,
        FilterMethod::Paeth
    ];

    pub const fn from_int(int: u8) -> Option<FilterMethod> {
        match int {
            0 => Some(FilterMethod::None),
            1 => Some(FilterMethod::Sub),
            2 => Some(FilterMethod::Up),
            3 => Some(FilterMethod::Average),
            4 => Some(FilterMethod::Paeth),
            _ => None
        }
    }

    /// The tag byte written in front of a row filtered with this method
    pub const fn to_int(self) -> u8 {
        match self {
            FilterMethod::None => 0,
            FilterMethod::Sub => 1,
            FilterMethod::Up => 2,
            FilterMethod::Average => 3,
            FilterMethod::Paeth => 4
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum InterlaceMethod {
    #[default]
    Standard,
    Adam7
}

impl InterlaceMethod {
    pub const fn from_int(int: u8) -> Option<InterlaceMethod> {
        match int {
            0 => Some(Self::Standard),
            1 => Some(Self::Adam7),
            _ => None
        }
    }
}

/// PNG colour types
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PngColor {
    Luma,
    Palette,
    LumaA,
    RGB,
    RGBA
}

impl PngColor {
    pub const fn num_components(self) -> u8 {
        match self {
            PngColor::Luma => 1,
            PngColor::Palette => 1,
            PngColor::LumaA => 2,
            PngColor::RGB => 3,
            PngColor::RGBA => 4
        }
    }

    /// Map a colour type number from the `IHDR` chunk
    pub const fn from_int(int: u8) -> Option<PngColor> {
        match int {
            0 => Some(Self::Luma),
            2 => Some(Self::RGB),
            3 => Some(Self::Palette),
            4 => Some(Self::LumaA),
            6 => Some(Self::RGBA),
            _ => None
        }
    }

    /// Bit depths the colour type may be stored in,
    /// table 11.1 of the PNG specification
    pub const fn allowed_depths(self) -> &'static [u8] {
        match self {
            PngColor::Luma => &[1, 2, 4, 8, 16],
            PngColor::Palette => &[1, 2, 4, 8],
            PngColor::LumaA | PngColor::RGB | PngColor::RGBA => &[8, 16]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_tags() {
        for (tag, filter) in FilterMethod::ALL.iter().enumerate() {
            assert_eq!(FilterMethod::from_int(tag as u8), Some(*filter));
            assert_eq!(filter.to_int(), tag as u8);
        }
        assert_eq!(FilterMethod::from_int(5), None);
    }

    #[test]
    fn test_ihdr_numbers() {
        assert_eq!(PngColor::from_int(6), Some(PngColor::RGBA));
        assert_eq!(PngColor::from_int(1), None);
        assert_eq!(InterlaceMethod::from_int(1), Some(InterlaceMethod::Adam7));
        assert_eq!(InterlaceMethod::from_int(2), None);
    }
}
