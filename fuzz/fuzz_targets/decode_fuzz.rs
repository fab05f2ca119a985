#![no_main]
use dhp2::format::{DecodeOptions, HEADER_SIZE, Header, NoTrace, unpack_with};
use libfuzzer_sys::fuzz_target;

const MAX_FULL_LENGTH: usize = 1 << 20;

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions {
        max_full_length: MAX_FULL_LENGTH,
        ..DecodeOptions::default()
    };

    // Raw input: mostly rejected at the header.
    let mut buf = data.to_vec();
    let _ = unpack_with(&mut buf, &opts, &mut NoTrace);

    // Same bytes behind a well-formed header so the token loop gets exercised.
    if data.len() >= 6 {
        let (fields, payload) = data.split_at(6);
        let header = Header {
            full_length: u32::from_le_bytes([fields[0], fields[1], 0, 0]) + payload.len() as u32,
            packed_length: (payload.len() + HEADER_SIZE) as u32,
            unpacked_prefix: u32::from(fields[2]),
            pack_mode: fields[3] % 9,
            shift_seed: fields[4],
        };
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(payload);
        if let Ok(h) = unpack_with(&mut buf, &opts, &mut NoTrace) {
            assert_eq!(buf.len(), h.full_length as usize);
        }
    }
});
