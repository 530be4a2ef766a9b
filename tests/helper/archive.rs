//! Zip fixtures

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Build a zip archive in memory from `(name, content)` pairs
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            continue;
        }
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A single-entry archive whose headers claim `declared` uncompressed bytes
/// while the compressed stream inflates to `content`.
pub fn zip_declaring_size(name: &str, content: &str, declared: u32) -> Vec<u8> {
    let mut bytes = zip_bytes(&[(name, content)]);
    // Uncompressed size sits 22 bytes into the local header and 24 bytes
    // into the central directory header.
    patch_u32(&mut bytes, b"PK\x03\x04", 22, declared);
    patch_u32(&mut bytes, b"PK\x01\x02", 24, declared);
    bytes
}

fn patch_u32(bytes: &mut [u8], signature: &[u8], offset: usize, value: u32) {
    let start = bytes
        .windows(signature.len())
        .position(|window| window == signature)
        .unwrap()
        + offset;
    bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
}

/// A minimal well-formed release archive
pub fn release_zip() -> Vec<u8> {
    zip_bytes(&[
        ("terraform", "#!/bin/sh\necho terraform\n"),
        ("LICENSE.txt", "Mozilla Public License"),
    ])
}
