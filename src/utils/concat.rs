//! Source tree concatenation
//!
//! Collects the source and header files under a project's chosen
//! subdirectories into one text file named after the project root, each
//! file preceded by a banner with its relative path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Concatenation errors
#[derive(Error, Debug)]
pub enum ConcatError {
    /// Root is missing or not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// A file or directory could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Output file could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// What to collect and where to write it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOptions {
    /// Project root
    pub root: PathBuf,
    /// Subdirectories of the root, visited in this order
    pub target_dirs: Vec<String>,
    /// File extensions to include, without the dot
    pub extensions: Vec<String>,
    /// Root-level build file emitted first, if present
    pub root_file: Option<String>,
    /// Directory the output file is written to
    pub output_dir: PathBuf,
}

impl ConcatOptions {
    /// Defaults: `include`, `lib`, `src`; `.c`, `.cpp`, `.h`; `CMakeLists.txt`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            target_dirs: vec!["include".into(), "lib".into(), "src".into()],
            extensions: vec!["c".into(), "cpp".into(), "h".into()],
            root_file: Some("CMakeLists.txt".into()),
            output_dir: PathBuf::from("."),
        }
    }

    /// Set target subdirectories
    #[must_use]
    pub fn target_dirs(mut self, dirs: Vec<String>) -> Self {
        self.target_dirs = dirs;
        self
    }

    /// Set file extensions
    #[must_use]
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set or clear the root build file
    #[must_use]
    pub fn root_file(mut self, name: Option<String>) -> Self {
        self.root_file = name;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

/// Result of a concatenation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatReport {
    /// Output file
    pub output: PathBuf,
    /// Relative paths of the files included, in output order
    pub files: Vec<PathBuf>,
}

fn banner(relative: &Path) -> String {
    format!("\n/********** {} **********/\n\n", relative.display())
}

fn read_entry(root: &Path, path: &Path) -> Result<(PathBuf, String), ConcatError> {
    let bytes = fs::read(path).map_err(|source| ConcatError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let entry = format!("{}{}", banner(&relative), String::from_utf8_lossy(&bytes));
    Ok((relative, entry))
}

/// Output file name: the root directory's own name plus `.txt`
fn output_name(root: &Path) -> Result<String, ConcatError> {
    let absolute = fs::canonicalize(root).map_err(|source| ConcatError::Read {
        path: root.to_path_buf(),
        source,
    })?;
    let name = absolute
        .file_name()
        .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(format!("{name}.txt"))
}

/// Concatenate the selected files and write the output
pub fn concatenate(options: &ConcatOptions) -> Result<ConcatReport, ConcatError> {
    let root = options.root.as_path();
    if !root.is_dir() {
        return Err(ConcatError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut entries = Vec::new();

    if let Some(name) = &options.root_file {
        let path = root.join(name);
        if path.is_file() {
            let (relative, entry) = read_entry(root, &path)?;
            files.push(relative);
            entries.push(entry);
        }
    }

    for dir in &options.target_dirs {
        let full = root.join(dir);
        if !full.is_dir() {
            tracing::debug!(dir = %full.display(), "skipping missing directory");
            continue;
        }

        // A directory's own files come before its subdirectories, each group by name
        let walker = WalkDir::new(&full).sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        });

        for item in walker {
            let item = item.map_err(|e| ConcatError::Read {
                path: e.path().map_or_else(|| full.clone(), Path::to_path_buf),
                source: e.into(),
            })?;
            if !item.file_type().is_file() || !options.wants(item.path()) {
                continue;
            }

            let (relative, entry) = read_entry(root, item.path())?;
            files.push(relative);
            entries.push(entry);
        }
    }

    let output = options.output_dir.join(output_name(root)?);
    fs::write(&output, entries.join("\n")).map_err(|source| ConcatError::Write {
        path: output.clone(),
        source,
    })?;

    tracing::info!(output = %output.display(), files = files.len(), "concatenated files");

    Ok(ConcatReport { output, files })
}
