//! Abstract storage backend the reader scans.
//!
//! The byte-level storage backend is an external collaborator: this crate
//! only ever talks to it through [`Directory`]. [`LocalDirectory`] is the
//! reference implementation over a plain filesystem path, provided because
//! in practice every dump a caller hands us either lives on local disk or is
//! already mounted to look like it does.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// A single entry in a directory listing.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

/// A snapshot mapping of file name to size, as produced by one
/// [`Directory::list_files`] call.
pub type Listing = HashMap<String, u64>;

pub fn listing_from(files: impl IntoIterator<Item = FileInfo>) -> Listing {
    files.into_iter().map(|f| (f.name, f.size)).collect()
}

/// An open, sequentially-readable handle on a file inside the dump directory.
pub trait DirFile: io::Read {}
impl<T: io::Read> DirFile for T {}

/// The storage backend a dump directory is read from.
///
/// Implementations need only support sequential reads; the reader never
/// seeks and never writes.
pub trait Directory: Send + Sync {
    /// List the files currently present. No ordering is guaranteed; callers
    /// normalize this into a [`Listing`] via [`listing_from`].
    fn list_files(&self) -> io::Result<Vec<FileInfo>>;

    /// Open `name` for sequential reading.
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Read `name` into memory in full. Convenience wrapper around
    /// [`Directory::open`] for the whole-file manifest/script reads the
    /// scanner performs.
    fn read_all(&self, name: &str) -> io::Result<Vec<u8>> {
        let mut file = self.open(name)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read `name` into a `String`. Returns an error if the contents are not
    /// valid UTF-8.
    fn read_to_string(&self, name: &str) -> io::Result<String> {
        let bytes = self.read_all(name)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Diagnostic-only path for log messages; not used for any I/O decision.
    fn full_path(&self) -> String;
}

/// Reference [`Directory`] implementation over a local filesystem path.
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Directory for LocalDirectory {
    fn list_files(&self) -> io::Result<Vec<FileInfo>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().into_string().map_err(|n| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non-utf8 file name: {:?}", n),
                )
            })?;
            files.push(FileInfo {
                name,
                size: meta.len(),
            });
        }

        Ok(files)
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(self.path_for(name))?;
        Ok(Box::new(file))
    }

    fn full_path(&self) -> String {
        self.root.display().to_string()
    }
}

impl LocalDirectory {
    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
