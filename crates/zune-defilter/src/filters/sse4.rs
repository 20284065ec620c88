/*
 * Copyright (c) 2023.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Sse capable defilter routines.
//!
//! `Sub` uses a two phase scan, a prefix sum of every channel inside a
//! 128 bit register followed by adding the last pixel of the previous register,
//! broadcast over all pixel slots.
//!
//! `Average` and `Paeth` still move one pixel at a time, but handle all
//! channels of a pixel at once. They are derived from the amazing spng at https://github.com/randy408/libspng
//! which derived them from libpng and hence they are governed by that license
//!
// COPYRIGHT NOTICE, DISCLAIMER, and LICENSE
// =========================================
//
// PNG Reference Library License version 2
// ---------------------------------------
//
//  * Copyright (c) 1995-2022 The PNG Reference Library Authors.
//  * Copyright (c) 2018-2022 Cosmin Truta.
//  * Copyright (c) 2000-2002, 2004, 2006-2018 Glenn Randers-Pehrson.
//  * Copyright (c) 1996-1997 Andreas Dilger.
//  * Copyright (c) 1995-1996 Guy Eric Schalnat, Group 42, Inc.
//
// The software is supplied "as is", without warranty of any kind,
// express or implied, including, without limitation, the warranties
// of merchantability, fitness for a particular purpose, title, and
// non-infringement.  In no event shall the Copyright owners, or
// anyone distributing the software, be liable for any damages or
// other liability, whether in contract, tort or otherwise, arising
// from, out of, or in connection with the software, or the use or
// other dealings in the software, even if advised of the possibility
// of such damage.
//
// Permission is hereby granted to use, copy, modify, and distribute
// this software, or portions hereof, for any purpose, without fee,
// subject to the following restrictions:
//
//  1. The origin of this software must not be misrepresented; you
//     must not claim that you wrote the original software.  If you
//     use this software in a product, an acknowledgment in the product
//     documentation would be appreciated, but is not required.
//
//  2. Altered source versions must be plainly marked as such, and must
//     not be misrepresented as being the original software.
//
//  3. This Copyright notice may not be removed or altered from any
//     source or altered source distribution.
//
//
// PNG Reference Library License version 1 (for libpng 0.5 through 1.6.35)
// -----------------------------------------------------------------------
//
// libpng versions 1.0.7, July 1, 2000, through 1.6.35, July 15, 2018 are
// Copyright (c) 2000-2002, 2004, 2006-2018 Glenn Randers-Pehrson, are
// derived from libpng-1.0.6, and are distributed according to the same
// disclaimer and license as libpng-1.0.6 with the following individuals
// added to the list of Contributing Authors:
//
//     Simon-Pierre Cadieux
//     Eric S. Raymond
//     Mans Rullgard
//     Cosmin Truta
//     Gilles Vollant
//     James Yu
//     Mandar Sahastrabuddhe
//     Google Inc.
//     Vadim Barkov
//
// and with the following additions to the disclaimer:
//
//     There is no warranty against interference with your enjoyment of
//     the library or against infringement.  There is no warranty that our
//     efforts or the library will fulfill any of your particular purposes
//     or needs.  This library is provided with all faults, and the entire
//     risk of satisfactory quality, performance, accuracy, and effort is
//     with the user.
//
// Some files in the "contrib" directory and some configure-generated
// files that are distributed with libpng have other copyright owners, and
// are released under other open source licenses.
//
// libpng versions 0.97, January 1998, through 1.0.6, March 20, 2000, are
// Copyright (c) 1998-2000 Glenn Randers-Pehrson, are derived from
// libpng-0.96, and are distributed according to the same disclaimer and
// license as libpng-0.96, with the following individuals added to the
// list of Contributing Authors:
//
//     Tom Lane
//     Glenn Randers-Pehrson
//     Willem van Schaik
//
// libpng versions 0.89, June 1996, through 0.96, May 1997, are
// Copyright (c) 1996-1997 Andreas Dilger, are derived from libpng-0.88,
// and are distributed according to the same disclaimer and license as
// libpng-0.88, with the following individuals added to the list of
// Contributing Authors:
//
//     John Bowler
//     Kevin Bracey
//     Sam Bushell
//     Magnus Holmgren
//     Greg Roelofs
//     Tom Tanner
//
// Some files in the "scripts" directory have other copyright owners,
// but are released under this license.
//
// libpng versions 0.5, May 1995, through 0.88, January 1996, are
// Copyright (c) 1995-1996 Guy Eric Schalnat, Group 42, Inc.
//
// For the purposes of this copyright and license, "Contributing Authors"
// is defined as the following set of individuals:
//
//     Andreas Dilger
//     Dave Martindale
//     Guy Eric Schalnat
//     Paul Schmidt
//     Tim Wegner
//
// The PNG Reference Library is supplied "AS IS".  The Contributing
// Authors and Group 42, Inc. disclaim all warranties, expressed or
// implied, including, without limitation, the warranties of
// merchantability and of fitness for any purpose.  The Contributing
// Authors and Group 42, Inc. assume no liability for direct, indirect,
// incidental, special, exemplary, or consequential damages, which may
// result from the use of the PNG Reference Library, even if advised of
// the possibility of such damage.
//
// Permission is hereby granted to use, copy, modify, and distribute this
// source code, or portions hereof, for any purpose, without fee, subject
// to the following restrictions:
//
//  1. The origin of this source code must not be misrepresented.
//
//  2. Altered versions must be plainly marked as such and must not
//     be misrepresented as being the original source.
//
//  3. This Copyright notice may not be removed or altered from any
//     source or altered source distribution.
//
// The Contributing Authors and Group 42, Inc. specifically permit,
// without fee, and encourage the use of this source code as a component
// to supporting the PNG file format in commercial products.  If you use
// this source code in a product, acknowledgment is not required but would
// be appreciated.
#![allow(dead_code)]

/// Whether SSE2 routines can be used on this machine
#[allow(unreachable_code)]
pub fn has_sse2() -> bool {
    #[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        #[cfg(feature = "std")]
        {
            return is_x86_feature_detected!("sse2");
        }
        #[cfg(all(not(feature = "std"), target_feature = "sse2"))]
        {
            return true;
        }
    }
    false
}

/// Whether SSE4.1 routines can be used on this machine
#[allow(unreachable_code)]
pub fn has_sse41() -> bool {
    #[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        #[cfg(feature = "std")]
        {
            return is_x86_feature_detected!("sse4.1");
        }
        #[cfg(all(not(feature = "std"), target_feature = "sse4.1"))]
        {
            return true;
        }
    }
    false
}

#[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
pub use x86::*;

#[cfg(all(feature = "sse", any(target_arch = "x86", target_arch = "x86_64")))]
mod x86 {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    use super::{has_sse2, has_sse41};
    use crate::filters::de_filter::{handle_avg_tail, handle_paeth_tail, handle_sub_tail};

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn load<const N: usize>(x: &[u8]) -> __m128i {
        let mut tmp = [0_u8; 16];
        tmp[..N].copy_from_slice(&x[..N]);
        _mm_loadu_si128(tmp.as_ptr().cast())
    }

    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn store<const N: usize>(x: &mut [u8], v: __m128i) {
        let mut tmp = [0_u8; 16];
        _mm_storeu_si128(tmp.as_mut_ptr().cast(), v);
        x[..N].copy_from_slice(&tmp[..N]);
    }

    /// Shift a register left by `bytes` bytes, shifting in zeroes
    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn shift_left(v: __m128i, bytes: usize) -> __m128i {
        match bytes {
            0 => v,
            1 => _mm_slli_si128::<1>(v),
            2 => _mm_slli_si128::<2>(v),
            3 => _mm_slli_si128::<3>(v),
            4 => _mm_slli_si128::<4>(v),
            5 => _mm_slli_si128::<5>(v),
            6 => _mm_slli_si128::<6>(v),
            7 => _mm_slli_si128::<7>(v),
            8 => _mm_slli_si128::<8>(v),
            9 => _mm_slli_si128::<9>(v),
            10 => _mm_slli_si128::<10>(v),
            11 => _mm_slli_si128::<11>(v),
            12 => _mm_slli_si128::<12>(v),
            13 => _mm_slli_si128::<13>(v),
            14 => _mm_slli_si128::<14>(v),
            15 => _mm_slli_si128::<15>(v),
            _ => _mm_setzero_si128()
        }
    }

    /// Shift a register right by `bytes` bytes, shifting in zeroes
    #[inline]
    #[target_feature(enable = "sse2")]
    unsafe fn shift_right(v: __m128i, bytes: usize) -> __m128i {
        match bytes {
            0 => v,
            1 => _mm_srli_si128::<1>(v),
            2 => _mm_srli_si128::<2>(v),
            3 => _mm_srli_si128::<3>(v),
            4 => _mm_srli_si128::<4>(v),
            5 => _mm_srli_si128::<5>(v),
            6 => _mm_srli_si128::<6>(v),
            7 => _mm_srli_si128::<7>(v),
            8 => _mm_srli_si128::<8>(v),
            9 => _mm_srli_si128::<9>(v),
            10 => _mm_srli_si128::<10>(v),
            11 => _mm_srli_si128::<11>(v),
            12 => _mm_srli_si128::<12>(v),
            13 => _mm_srli_si128::<13>(v),
            14 => _mm_srli_si128::<14>(v),
            15 => _mm_srli_si128::<15>(v),
            _ => _mm_setzero_si128()
        }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn de_filter_sub_sse2_inner<const N: usize>(current: &mut [u8]) {
        // whole pixels per register, the remaining bytes are loaded but never stored
        let block = (16 / N) * N;

        let mut carry = _mm_setzero_si128();
        let mut position = 0;
        let mut tmp = [0_u8; 16];

        while position + 16 <= current.len() {
            let mut x = _mm_loadu_si128(current[position..].as_ptr().cast());

            // running sum of every channel within the register
            let mut shift = N;
            while shift < block {
                x = _mm_add_epi8(x, shift_left(x, shift));
                shift *= 2;
            }
            x = _mm_add_epi8(x, carry);

            _mm_storeu_si128(tmp.as_mut_ptr().cast(), x);
            current[position..position + block].copy_from_slice(&tmp[..block]);

            // isolate the last whole pixel and spread it over every pixel slot
            let mut last = shift_right(shift_left(x, 16 - block), 16 - N);
            let mut width = N;
            while width < block {
                last = _mm_or_si128(last, shift_left(last, width));
                width *= 2;
            }
            carry = last;
            position += block;
        }
        handle_sub_tail(current, N, position);
    }

    pub fn de_filter_sub_sse2<const N: usize>(current: &mut [u8]) {
        debug_assert!(has_sse2());
        // SAFETY: only called when the backend was resolved to one with sse2
        unsafe { de_filter_sub_sse2_inner::<N>(current) }
    }

    #[inline]
    #[target_feature(enable = "sse4.1")]
    unsafe fn if_then_else(c: __m128i, t: __m128i, e: __m128i) -> __m128i {
        _mm_blendv_epi8(e, t, c)
    }

    #[allow(unused_assignments)]
    #[target_feature(enable = "sse4.1")]
    unsafe fn de_filter_paeth_sse41_inner<const N: usize>(prev_row: &[u8], current: &mut [u8]) {
        /* Paeth tries to predict pixel d using the pixel to the left of it, a,
         * and two pixels from the previous row, b and c:
         *   prev: c b
         *   row:  a d
         * The Paeth function predicts d to be whichever of a, b, or c is nearest to
         * p=a+b-c.
         *
         * The first pixel has no left context, and so uses an Up filter, p = b.
         * This works naturally with our main loop's p = a+b-c if we force a and c
         * to zero.
         * Here we zero b and d, which become c and a respectively at the start of
         * the loop.
         */
        let zero = _mm_setzero_si128();

        let (mut c, mut b, mut a, mut d) = (zero, zero, zero, zero);

        let (mut pa, mut pb, mut pc, mut smallest, mut nearest);

        for (prev, row) in prev_row.chunks_exact(N).zip(current.chunks_exact_mut(N)) {
            // It's easiest to do this math (particularly, deal with pc) with 16-bit
            // intermediates.
            c = b;
            b = _mm_unpacklo_epi8(load::<N>(prev), zero);
            a = d;
            d = _mm_unpacklo_epi8(load::<N>(row), zero);

            /* (p-a) == (a+b-c - a) == (b-c) */
            pa = _mm_sub_epi16(b, c);

            /* (p-b) == (a+b-c - b) == (a-c) */
            pb = _mm_sub_epi16(a, c);

            /* (p-c) == (a+b-c - c) == (a+b-c-c) == (b-c)+(a-c) */
            pc = _mm_add_epi16(pa, pb);

            pa = _mm_abs_epi16(pa); /* |p-a| */
            pb = _mm_abs_epi16(pb); /* |p-b| */
            pc = _mm_abs_epi16(pc); /* |p-c| */

            smallest = _mm_min_epi16(pc, _mm_min_epi16(pa, pb));

            /* Paeth breaks ties favoring a over b over c. */
            nearest = if_then_else(
                _mm_cmpeq_epi16(smallest, pa),
                a,
                if_then_else(_mm_cmpeq_epi16(smallest, pb), b, c)
            );

            /* Note `_epi8`: we need addition to wrap modulo 255. */
            d = _mm_add_epi8(d, nearest);

            store::<N>(row, _mm_packus_epi16(d, d));
        }
        let done = current.len() - current.len() % N;
        handle_paeth_tail(prev_row, current, N, done);
    }

    /// Carries out de-filtering of a paeth filtered scanline using SSE4.1
    pub fn de_filter_paeth_sse41<const N: usize>(prev_row: &[u8], current: &mut [u8]) {
        debug_assert!(has_sse41());
        // SAFETY: only called when the backend was resolved to sse4.1
        unsafe { de_filter_paeth_sse41_inner::<N>(prev_row, current) }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn defilter_avg_sse2_inner<const N: usize>(prev_row: &[u8], current: &mut [u8]) {
        /* The Avg filter predicts each pixel as the (truncated) average of a and b.
         * There's no pixel to the left of the first pixel.  Luckily, it's
         * predicted to be half of the pixel above it.  So again, this works
         * perfectly with our loop if we make sure a starts at zero.
         */
        let ones = _mm_set1_epi8(1);
        let mut d = _mm_setzero_si128();

        for (prev, row) in prev_row.chunks_exact(N).zip(current.chunks_exact_mut(N)) {
            let b = load::<N>(prev);
            let a = d;
            d = load::<N>(row);

            /* PNG requires a truncating average, so we can't just use _mm_avg_epu8 */
            let mut avg = _mm_avg_epu8(a, b);
            /* ...but we can fix it up by subtracting off 1 if it rounded up. */
            avg = _mm_sub_epi8(avg, _mm_and_si128(_mm_xor_si128(a, b), ones));

            d = _mm_add_epi8(d, avg);
            store::<N>(row, d);
        }
        let done = current.len() - current.len() % N;
        handle_avg_tail(prev_row, current, N, done);
    }

    pub fn defilter_avg_sse2<const N: usize>(prev_row: &[u8], current: &mut [u8]) {
        debug_assert!(has_sse2());
        // SAFETY: only called when the backend was resolved to one with sse2
        unsafe { defilter_avg_sse2_inner::<N>(prev_row, current) }
    }
}
