// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for zipped shapefile loading

#![no_main]

use bytes::Bytes;
use ferry_formats::codecs::shapefile::ShapefileCodec;
use ferry_formats::{Loader, Payload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = ShapefileCodec.load(Payload::Binary(Bytes::copy_from_slice(data)));
});
