// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for StorePath parsing and joining

#![no_main]

use arbitrary::Arbitrary;
use fw_core::StorePath;
use libfuzzer_sys::fuzz_target;
use std::path::Path;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    subdir: Option<&'a str>,
    filename: &'a str,
    tail: &'a str,
}

fn assert_normalized(path: &StorePath) {
    for segment in &path.segments {
        assert!(!segment.is_empty());
        assert!(segment != "." && segment != "..");
        assert!(!segment.contains(['/', '\\', '\0']));
    }
}

fuzz_target!(|input: Input<'_>| {
    if let Ok(dir) = StorePath::dir(input.subdir) {
        assert_normalized(&dir);

        if let Ok(joined) = dir.join(input.tail) {
            assert_normalized(&joined);
        }
    }

    if let Ok(file) = StorePath::file(input.subdir, input.filename) {
        assert_normalized(&file);
        assert!(!file.is_root());

        // Rendering and re-parsing is stable
        let reparsed = StorePath::parse(file.to_path_string()).expect("rendered path parses");
        assert_eq!(reparsed, file);

        let root = Path::new("/store");
        let back = StorePath::from_fs_path(root, &file.to_fs_path(root)).expect("inside root");
        assert_eq!(back, file);
    }
});
