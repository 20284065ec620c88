/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Portable `Sub` de-filtering using a prefix sum over 64 bit words
//!
//! Reconstructing a `Sub` row is a running sum per channel,
//! `out[i] = raw[i] + out[i - bpp]`. Instead of walking one byte at a time,
//! a word of 8 bytes is loaded and the running sum of every channel inside the
//! word is computed with `log2(pixels)` shifted adds. The last pixel of the word
//! is then broadcast into the next word as its carry.
//!
//! A word holds `8 / bpp` whole pixels, bytes past the last whole pixel are loaded
//! but never stored.
use crate::filters::de_filter::handle_sub_tail;

const LOW_SEVEN: u64 = 0x7f7f_7f7f_7f7f_7f7f;
const HIGH_BITS: u64 = 0x8080_8080_8080_8080;

/// Add every byte of `x` to the corresponding byte of `y`, modulo 256
///
/// Carries never cross byte boundaries.
#[inline(always)]
fn add_bytes(x: u64, y: u64) -> u64 {
    ((x & LOW_SEVEN) + (y & LOW_SEVEN)) ^ ((x ^ y) & HIGH_BITS)
}

/// Running sum of every channel over the whole pixels of `x`
#[inline(always)]
fn prefix_sum<const N: usize>(mut x: u64) -> u64 {
    let block = (8 / N) * N;
    let mut shift = N;

    while shift < block {
        x = add_bytes(x, x << (8 * shift));
        shift *= 2;
    }
    x
}

/// Copy the pixel in the low `N` bytes of `pixel` into every pixel slot of a word
#[inline(always)]
fn broadcast<const N: usize>(pixel: u64) -> u64 {
    let block = (8 / N) * N;
    let mut out = pixel;
    let mut width = N;

    while width < block {
        out |= out << (8 * width);
        width *= 2;
    }
    out
}

pub fn defilter_sub_swar<const N: usize>(current: &mut [u8]) {
    let block = (8 / N) * N;
    let last_pixel = 8 * (block - N);
    let pixel_mask = u64::MAX >> (64 - 8 * N);

    let mut carry = 0_u64;
    let mut position = 0;
    let mut word = [0_u8; 8];

    while position + 8 <= current.len() {
        word.copy_from_slice(&current[position..position + 8]);

        let x = add_bytes(prefix_sum::<N>(u64::from_le_bytes(word)), carry);

        current[position..position + block].copy_from_slice(&x.to_le_bytes()[..block]);

        carry = broadcast::<N>((x >> last_pixel) & pixel_mask);
        position += block;
    }
    handle_sub_tail(current, N, position);
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::filters::de_filter::handle_sub;

    #[test]
    fn test_add_bytes_wraps_per_byte() {
        let x = u64::from_le_bytes([255, 1, 128, 0, 200, 7, 255, 128]);
        let y = u64::from_le_bytes([1, 255, 128, 0, 100, 9, 255, 127]);

        assert_eq!(
            add_bytes(x, y).to_le_bytes(),
            [0, 0, 0, 0, 44, 16, 254, 255]
        );
    }

    #[test]
    fn test_broadcast_three_bytes() {
        let pixel = u64::from_le_bytes([1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(
            broadcast::<3>(pixel).to_le_bytes(),
            [1, 2, 3, 1, 2, 3, 0, 0]
        );
    }

    fn check<const N: usize>(row: &[u8]) {
        let mut expected = row.to_vec();
        let mut found = row.to_vec();

        handle_sub(&mut expected, N);
        defilter_sub_swar::<N>(&mut found);

        assert_eq!(expected, found, "bpp={} len={}", N, row.len());
    }

    #[test]
    fn test_swar_matches_scalar() {
        for len in 0..70 {
            let row: Vec<u8> = (0..len).map(|x| (x as u8).wrapping_mul(173) ^ 0x3c).collect();
            check::<1>(&row);
            check::<2>(&row);
            check::<3>(&row);
            check::<4>(&row);
            check::<6>(&row);
            check::<8>(&row);
        }
    }
}
