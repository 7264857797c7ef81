use crate::error::IngestError;
use crate::models::RawInput;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}

pub fn load_input(path: &Path, container_id: &str) -> Result<RawInput, IngestError> {
    let claimed_filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::InvalidArgument(format!("path has no file name: {}", path.display()))
        })?
        .to_string();

    Ok(RawInput {
        bytes: fs::read(path)?,
        claimed_filename,
        container_id: container_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{discover_files, load_input};
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discover_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.zip")).and_then(|mut file| file.write_all(b"PK"))?;
        File::create(nested.join("b.txt")).and_then(|mut file| file.write_all(b"text"))?;

        let files = discover_files(base);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.zip"));
        Ok(())
    }

    #[test]
    fn single_file_is_discovered_as_itself() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("only.pdf");
        fs::write(&path, b"%PDF-1.4")?;

        assert_eq!(discover_files(&path), vec![path]);
        Ok(())
    }

    #[test]
    fn input_takes_the_file_name() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("文档.txt");
        fs::write(&path, b"body")?;

        let input = load_input(&path, "project-9")?;
        assert_eq!(input.claimed_filename, "文档.txt");
        assert_eq!(input.container_id, "project-9");
        assert_eq!(input.bytes, b"body");
        Ok(())
    }
}
