//! Fuzz target for single-line label parsing.
//!
//! Feeds arbitrary UTF-8 lines to the parser under both schemas and checks
//! for panics or hangs.

#![no_main]

use labelscope::parser::fuzz_parse_label_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    fuzz_parse_label_line(line);
});
