//! Package extraction and repackaging
//!
//! A [`PackageTree`] is one call's private scratch copy of the template:
//! the archive unpacked into a temporary directory that every other stage
//! mutates as plain XML text. The directory is removed when the tree drops,
//! on success and failure alike.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{StampError, StampResult};

/// Scratch extraction of one template package
#[derive(Debug)]
pub struct PackageTree {
    root: TempDir,
}

impl PackageTree {
    /// Extract a template package from raw archive bytes.
    ///
    /// Verifies the parts every spreadsheet package must carry before
    /// writing anything to disk.
    pub fn extract(template: &[u8]) -> StampResult<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(template))?;

        // Verify this is a spreadsheet package
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(StampError::InvalidPackage(
                "missing [Content_Types].xml".into(),
            ));
        }
        if archive.by_name("xl/workbook.xml").is_err() {
            return Err(StampError::InvalidPackage("missing xl/workbook.xml".into()));
        }

        let root = TempDir::new()?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;

            // Reject entries that would escape the scratch root
            let rel_path = match file.enclosed_name() {
                Some(p) => p.to_path_buf(),
                None => {
                    return Err(StampError::InvalidPackage(format!(
                        "unsafe entry name: {}",
                        file.name()
                    )))
                }
            };

            if file.is_dir() {
                continue;
            }

            let dest = root.path().join(&rel_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)?;
            fs::write(&dest, contents)?;
        }

        Ok(Self { root })
    }

    /// Extract a template from a file path, failing fast before extraction
    /// when the file does not exist.
    pub fn extract_file<P: AsRef<Path>>(path: P) -> StampResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StampError::TemplateNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        Self::extract(&bytes)
    }

    fn part_path(&self, name: &str) -> PathBuf {
        // Part names always use forward slashes
        let mut path = self.root.path().to_path_buf();
        for segment in name.split('/') {
            path.push(segment);
        }
        path
    }

    /// Whether a part exists in the tree
    pub fn has_part(&self, name: &str) -> bool {
        self.part_path(name).is_file()
    }

    /// Read a part as XML text
    pub fn read_part(&self, name: &str) -> StampResult<String> {
        let path = self.part_path(name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StampError::MissingPart(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write (or overwrite) a part
    pub fn write_part(&self, name: &str, contents: &str) -> StampResult<()> {
        let path = self.part_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Remove a part; removing an absent part is a no-op
    pub fn remove_part(&self, name: &str) -> StampResult<()> {
        let path = self.part_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Rename a part, replacing any part already at the destination
    pub fn rename_part(&self, from: &str, to: &str) -> StampResult<()> {
        let src = self.part_path(from);
        let dest = self.part_path(to);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(src, dest)?;
        Ok(())
    }

    /// List every part in the tree, sorted, with forward-slash names
    pub fn part_names(&self) -> StampResult<Vec<String>> {
        let mut names = Vec::new();
        let mut stack = vec![self.root.path().to_path_buf()];

        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(self.root.path()) {
                    let name = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Repack the remaining tree into output archive bytes.
    ///
    /// Walks the tree as it stands, so a part removed earlier can never
    /// reappear in the output.
    pub fn repack(&self) -> StampResult<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();

            for name in self.part_names()? {
                let contents = fs::read(self.part_path(&name))?;
                zip.start_file(name.as_str(), options)?;
                zip.write_all(&contents)?;
            }

            zip.finish()?;
        }
        Ok(buf)
    }
}
