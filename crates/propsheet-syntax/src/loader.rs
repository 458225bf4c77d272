use indexmap::IndexMap;
use std::cell::Cell;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Where imported documents come from.
pub trait SourceLoader {
    /// The identity of `path`, used to skip documents that were already imported.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn load(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemLoader;

impl SourceLoader for FileSystemLoader {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Lexically normalize `path`: drop `.` and fold `..` into the preceding component.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut ret = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !ret.pop() {
                    ret.push("..");
                }
            }
            other => ret.push(other.as_os_str()),
        }
    }
    ret
}

/// An in-memory file set, mostly useful for tests.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: IndexMap<PathBuf, String>,
    loads: Cell<usize>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file<P: AsRef<Path>, S: Into<String>>(mut self, path: P, text: S) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert<P: AsRef<Path>, S: Into<String>>(&mut self, path: P, text: S) {
        self.files
            .insert(normalize_path(path.as_ref()), text.into());
    }

    /// How many times a document was handed out by [`SourceLoader::load`].
    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl SourceLoader for MemoryLoader {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let path = normalize_path(path);
        if self.files.contains_key(&path) {
            Ok(path)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        }
    }

    fn load(&self, path: &Path) -> io::Result<String> {
        let path = normalize_path(path);
        let text = self.files.get(&path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })?;
        self.loads.set(self.loads.get() + 1);
        Ok(text)
    }
}
