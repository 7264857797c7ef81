use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafePath {
    Empty,
    NulByte,
    AbsolutePath,
    BackslashRoot,
    DriveLetter,
    ParentTraversal,
    NoFileName,
}

impl fmt::Display for UnsafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            UnsafePath::Empty => "empty entry name",
            UnsafePath::NulByte => "entry name contains a NUL byte",
            UnsafePath::AbsolutePath => "absolute path",
            UnsafePath::BackslashRoot => "path starts with a backslash",
            UnsafePath::DriveLetter => "drive-letter prefix",
            UnsafePath::ParentTraversal => "parent directory segment",
            UnsafePath::NoFileName => "no file name segment",
        };
        f.write_str(reason)
    }
}

pub fn check_entry_path(raw_path: &str) -> Result<(), UnsafePath> {
    if raw_path.is_empty() {
        return Err(UnsafePath::Empty);
    }
    if raw_path.contains('\0') {
        return Err(UnsafePath::NulByte);
    }
    if raw_path.starts_with('/') {
        return Err(UnsafePath::AbsolutePath);
    }
    if raw_path.starts_with('\\') {
        return Err(UnsafePath::BackslashRoot);
    }
    if has_drive_prefix(raw_path) {
        return Err(UnsafePath::DriveLetter);
    }
    if raw_path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(UnsafePath::ParentTraversal);
    }
    if raw_path
        .split(['/', '\\'])
        .all(|segment| segment.is_empty() || segment == ".")
    {
        return Err(UnsafePath::NoFileName);
    }

    Ok(())
}

pub fn is_safe_entry_path(raw_path: &str) -> bool {
    check_entry_path(raw_path).is_ok()
}

fn has_drive_prefix(raw_path: &str) -> bool {
    match raw_path.as_bytes() {
        [letter, b':', separator, ..] => {
            letter.is_ascii_alphabetic() && (*separator == b'\\' || *separator == b'/')
        }
        _ => false,
    }
}
