/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scalar de-filter routines.
//!
//! These are the reference for all other routines, and handle whatever
//! the vector routines can't (odd bytes per pixel, row tails).
#![allow(dead_code)]

pub fn handle_sub(current: &mut [u8], components: usize) {
    // leftmost pixel has nothing to its left and is stored as is
    for i in components..current.len() {
        let a = current[i - components];
        current[i] = current[i].wrapping_add(a);
    }
}

pub fn handle_up(prev_row: &[u8], current: &mut [u8]) {
    for (recon, up) in current.iter_mut().zip(prev_row) {
        *recon = recon.wrapping_add(*up);
    }
}

pub fn handle_avg(prev_row: &[u8], current: &mut [u8], components: usize) {
    let end = current.len().min(prev_row.len());
    let first = components.min(end);

    // handle leftmost pixel explicitly
    for i in 0..first {
        current[i] = current[i].wrapping_add(prev_row[i] >> 1);
    }

    for i in first..end {
        // this needs to be performed with at least 9 bits of precision, so bump
        // it up to 16.
        let a = u16::from(current[i - components]);
        let b = u16::from(prev_row[i]);

        current[i] = current[i].wrapping_add(((a + b) >> 1) as u8);
    }
}

/// Average for the first row of an image or pass
///
/// The row above is zero so the prediction is half the left pixel
pub fn handle_avg_first(current: &mut [u8], components: usize) {
    for i in components..current.len() {
        let a = current[i - components];
        current[i] = current[i].wrapping_add(a >> 1);
    }
}

pub fn handle_paeth(prev_row: &[u8], current: &mut [u8], components: usize) {
    let end = current.len().min(prev_row.len());
    let first = components.min(end);

    // with no left or upper-left neighbour, paeth(0, b, 0) is always b
    for i in 0..first {
        current[i] = current[i].wrapping_add(prev_row[i]);
    }

    for i in first..end {
        let paeth_res = paeth(
            current[i - components],
            prev_row[i],
            prev_row[i - components]
        );
        current[i] = current[i].wrapping_add(paeth_res);
    }
}

/// Average for bytes `start..` of a row whose bytes before `start`
/// are already reconstructed
///
/// Used for the tails vector routines leave behind
pub fn handle_avg_tail(prev_row: &[u8], current: &mut [u8], components: usize, start: usize) {
    let end = current.len().min(prev_row.len());

    for i in start..end {
        let a = if i >= components {
            u16::from(current[i - components])
        } else {
            0
        };
        let b = u16::from(prev_row[i]);

        current[i] = current[i].wrapping_add(((a + b) >> 1) as u8);
    }
}

/// Paeth for bytes `start..` of a row whose bytes before `start`
/// are already reconstructed
pub fn handle_paeth_tail(prev_row: &[u8], current: &mut [u8], components: usize, start: usize) {
    let end = current.len().min(prev_row.len());

    for i in start..end {
        let (a, c) = if i >= components {
            (current[i - components], prev_row[i - components])
        } else {
            (0, 0)
        };
        current[i] = current[i].wrapping_add(paeth(a, prev_row[i], c));
    }
}

/// Sub for bytes `start..` of a row whose bytes before `start`
/// are already reconstructed
pub fn handle_sub_tail(current: &mut [u8], components: usize, start: usize) {
    for i in start.max(components)..current.len() {
        let a = current[i - components];
        current[i] = current[i].wrapping_add(a);
    }
}

/// The Paeth predictor as defined by the PNG specification
///
/// Predicts a byte from its left (`a`), above (`b`) and upper left (`c`)
/// neighbours as whichever is closest to `a + b - c`, breaking ties in the order
/// `a`, `b`, `c`.
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let a = i16::from(a);
    let b = i16::from(b);
    let c = i16::from(c);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        return a as u8;
    }
    if pb <= pc {
        return b as u8;
    }
    c as u8
}

#[inline(always)]
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    // FROM STB
    // This formulation looks very different from the reference in the PNG spec, but is
    // actually equivalent and has favorable data dependencies and admits straightforward
    // generation of branch-free code, which helps performance significantly.

    let a = i32::from(a);
    let b = i32::from(b);
    let c = i32::from(c);
    let thresh = c * 3 - (a + b);
    let lo = if a < b { a } else { b };
    let hi = if a < b { b } else { a };

    let t0 = if hi <= thresh { lo } else { c };
    let t1 = if thresh <= lo { hi } else { t0 };
    t1 as u8
}
