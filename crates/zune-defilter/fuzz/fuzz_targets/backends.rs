#![no_main]

use libfuzzer_sys::fuzz_target;
use zune_defilter::filters::reconstruct_row_with_backend;
use zune_defilter::Backend;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let tag = data[0] % 5;
    let bpp = usize::from(data[1] % 8) + 1;

    let rest = &data[2..];
    let len = rest.len() / 2;
    let (row, previous) = rest.split_at(len);
    let previous = &previous[..len];

    let mut expected = row.to_vec();
    reconstruct_row_with_backend(tag, &mut expected, Some(previous), bpp, Backend::Scalar).unwrap();

    for backend in [Backend::Swar, Backend::Sse2, Backend::Sse41] {
        let mut found = row.to_vec();
        reconstruct_row_with_backend(tag, &mut found, Some(previous), bpp, backend).unwrap();
        assert_eq!(expected, found, "{backend:?}");
    }
});
