#![no_main]

use libfuzzer_sys::fuzz_target;
use zune_defilter::zune_core::options::DecoderOptions;
use zune_defilter::{ImageGeometry, InterlaceMethod, ScanlineDecoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (header, stream) = data.split_at(4);

    let width = usize::from(header[0]) + 1;
    let height = usize::from(header[1]) + 1;
    let depth = [1, 2, 4, 8, 16][usize::from(header[2] % 5)];
    let channels = header[3] % 4 + 1;

    let Ok(mut geometry) = ImageGeometry::new(width, height, depth, channels) else {
        return;
    };
    if header[3] & 0x80 != 0 {
        geometry = geometry.with_interlace(InterlaceMethod::Adam7);
    }
    let opts = DecoderOptions::new_fast();

    if let Ok(mut decoder) = ScanlineDecoder::new_with_options(stream, geometry, opts) {
        let _ = decoder.decode();
    }
});
