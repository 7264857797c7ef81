use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("directory entry should be written");
        } else {
            writer
                .start_file(*name, options)
                .expect("file entry should start");
            writer
                .write_all(contents)
                .expect("file entry should be written");
        }
    }

    writer
        .finish()
        .expect("archive should finish")
        .into_inner()
}

pub(crate) fn long_text(label: &str) -> String {
    format!("{label}: ")
        + &"Bidder shall provide pricing for every line item in the schedule. ".repeat(5)
}
