// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for the netCDF classic reader

#![no_main]

use ferry_formats::codecs::netcdf;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(dataset) = netcdf::read(data) {
        // Anything we can read we must be able to write again
        let _ = netcdf::write(&dataset);
    }
});
