// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for logical path parsing and the storage key codec

#![no_main]

use ferry_core::path::{LogicalPath, PathCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let path = LogicalPath::new(input);
        let _ = path.suffix();
        let _ = path.stem();
        let _ = path.parent();
        let _ = path.with_suffix(".zip");

        // Keys must map back to the path they came from
        let codec = PathCodec::default();
        if let Ok(key) = codec.to_storage_key(&path) {
            assert_eq!(codec.to_logical_path(&key), path);
        }

        let rooted = codec.root().join(input);
        assert!(rooted.starts_with(codec.root()) || input.contains(".."));
    }
});
