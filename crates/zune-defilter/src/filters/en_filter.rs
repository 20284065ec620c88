/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Forward filters, the inverse of the de-filter routines.
//!
//! These are not tuned, they exist to produce streams for tests, benchmarks
//! and the encoder.
use crate::enums::FilterMethod;
use crate::error::DefilterErrors;
use crate::filters::de_filter::paeth;

/// Filter `current` into `out` using `filter`
///
/// # Arguments
/// - `filter`: Filter to apply
/// - `current`: Unfiltered row
/// - `previous`: The unfiltered row above, `None` for the first row
///   of an image or interlace pass
/// - `out`: Output, must be as long as `current`. The filter tag is not written
/// - `components`: Bytes per pixel
pub fn filter_row(
    filter: FilterMethod, current: &[u8], previous: Option<&[u8]>, out: &mut [u8],
    components: usize
) -> Result<(), DefilterErrors> {
    if components == 0 {
        return Err(DefilterErrors::InvalidBytesPerPixel(components));
    }
    if out.len() != current.len() {
        return Err(DefilterErrors::RowLengthMismatch {
            expected: current.len(),
            found:    out.len()
        });
    }
    if let Some(previous) = previous {
        if previous.len() != current.len() {
            return Err(DefilterErrors::RowLengthMismatch {
                expected: current.len(),
                found:    previous.len()
            });
        }
    }
    filter_scanline(filter, current, previous, out, components);
    Ok(())
}

fn filter_scanline(
    filter: FilterMethod, current: &[u8], previous: Option<&[u8]>, out: &mut [u8],
    components: usize
) {
    let up = |i: usize| previous.map_or(0, |p| p[i]);

    match filter {
        FilterMethod::None => out.copy_from_slice(current),
        FilterMethod::Sub => {
            for (i, (out, cur)) in out.iter_mut().zip(current).enumerate() {
                let a = if i >= components { current[i - components] } else { 0 };
                *out = cur.wrapping_sub(a);
            }
        }
        FilterMethod::Up => {
            for (i, (out, cur)) in out.iter_mut().zip(current).enumerate() {
                *out = cur.wrapping_sub(up(i));
            }
        }
        FilterMethod::Average => {
            for (i, (out, cur)) in out.iter_mut().zip(current).enumerate() {
                let a = if i >= components { u16::from(current[i - components]) } else { 0 };
                let b = u16::from(up(i));
                *out = cur.wrapping_sub(((a + b) >> 1) as u8);
            }
        }
        FilterMethod::Paeth => {
            for (i, (out, cur)) in out.iter_mut().zip(current).enumerate() {
                let (a, c) = if i >= components {
                    (current[i - components], up(i - components))
                } else {
                    (0, 0)
                };
                *out = cur.wrapping_sub(paeth(a, up(i), c));
            }
        }
    }
}

/// Cost of a filtered row, the sum of its bytes read as signed values
fn row_cost(row: &[u8]) -> u64 {
    row.iter()
        .map(|x| u64::from((*x as i8).unsigned_abs()))
        .sum()
}

/// Pick the filter that minimizes the sum of absolute differences of the
/// filtered row, ties go to the lower numbered filter.
///
/// On return `scratch` holds `current` filtered with the chosen filter.
///
/// # Panics
/// If `scratch` is shorter than `current`, or `previous` is shorter than `current`
pub fn choose_filter(
    current: &[u8], previous: Option<&[u8]>, components: usize, scratch: &mut [u8]
) -> FilterMethod {
    let components = components.max(1);
    let scratch = &mut scratch[..current.len()];

    let mut best = FilterMethod::None;
    let mut best_cost = u64::MAX;

    for filter in FilterMethod::ALL {
        filter_scanline(filter, current, previous, scratch, components);
        let cost = row_cost(scratch);

        if cost < best_cost {
            best = filter;
            best_cost = cost;
        }
    }
    // the last filter tried was paeth, redo the winner if it wasn't
    if best != FilterMethod::Paeth {
        filter_scanline(best, current, previous, scratch, components);
    }
    best
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn test_constant_row_prefers_sub() {
        let current = [9_u8; 12];
        let mut scratch = [0_u8; 12];

        let filter = choose_filter(&current, None, 1, &mut scratch);

        assert_eq!(filter, FilterMethod::Sub);
        assert_eq!(scratch[0], 9);
        assert!(scratch[1..].iter().all(|x| *x == 0));
    }

    #[test]
    fn test_zero_row_keeps_none() {
        // every filter costs zero, the lowest wins
        let current = [0_u8; 8];
        let mut scratch = [1_u8; 8];

        assert_eq!(
            choose_filter(&current, Some(&[0; 8]), 3, &mut scratch),
            FilterMethod::None
        );
        assert_eq!(scratch, [0; 8]);
    }

    #[test]
    fn test_repeated_rows_prefer_up() {
        let previous = [1, 200, 3, 90, 17, 250, 33, 4];
        let mut scratch = vec![0; previous.len()];

        assert_eq!(
            choose_filter(&previous, Some(&previous), 1, &mut scratch),
            FilterMethod::Up
        );
    }

    #[test]
    fn test_filter_row_rejects_bad_lengths() {
        let mut out = [0; 3];
        assert!(matches!(
            filter_row(FilterMethod::Sub, &[1, 2, 3, 4], None, &mut out, 1),
            Err(DefilterErrors::RowLengthMismatch { expected: 4, found: 3 })
        ));
        assert!(matches!(
            filter_row(FilterMethod::Up, &[1, 2, 3], Some(&[1]), &mut out, 1),
            Err(DefilterErrors::RowLengthMismatch { expected: 3, found: 1 })
        ));
    }
}
