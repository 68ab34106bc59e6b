//! Workspace file access.
//!
//! Resolves root-relative filenames against the configured source and output
//! roots, decides text vs binary reads from the extension, and keeps all
//! pipeline paths separator-normalized (forward slashes).

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::SluiceConfig;
use crate::file::FileContent;

/// Extensions always read as binary, on top of the configured list.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "ico", "bmp", "woff", "woff2", "ttf", "otf", "eot",
    "zip", "gz", "tar", "pdf", "mp3", "mp4", "ogg", "wav", "wasm",
];

/// Path resolution and file IO for one workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    src_root: PathBuf,
    out_root: PathBuf,
    binary_exts: HashSet<String>,
}

impl Workspace {
    /// Build a workspace from configuration.
    pub fn from_config(config: &SluiceConfig) -> Self {
        let src_root = config.cwd.join(&config.src);
        let out_root = config.cwd.join(&config.output);
        let mut binary_exts: HashSet<String> =
            BINARY_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        binary_exts.extend(config.binary_resource.iter().map(|e| e.to_lowercase()));

        Self { src_root, out_root, binary_exts }
    }

    /// Source root directory.
    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    /// Output root directory.
    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    /// Whether source and output resolve to the same directory.
    pub fn roots_coincide(&self) -> bool {
        let src = self.src_root.canonicalize().unwrap_or_else(|_| self.src_root.clone());
        let out = self.out_root.canonicalize().unwrap_or_else(|_| self.out_root.clone());
        src == out
    }

    /// Whether the output root is nested under the source root.
    pub fn output_inside_src(&self) -> bool {
        self.out_root.starts_with(&self.src_root)
    }

    /// Whether a filename should be read/written as binary.
    pub fn is_binary(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.binary_exts.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Absolute path of a root-relative source file.
    pub fn locate(&self, filename: &str) -> PathBuf {
        self.src_root.join(filename)
    }

    /// Absolute path of a root-relative output file.
    pub fn locate_output(&self, filename: &str) -> PathBuf {
        self.out_root.join(filename)
    }

    /// Read a source file, as text or binary per its extension.
    pub fn read(&self, filename: &str) -> io::Result<FileContent> {
        let path = self.locate(filename);
        if self.is_binary(filename) {
            Ok(FileContent::Binary(fs::read(path)?))
        } else {
            Ok(FileContent::Text(fs::read_to_string(path)?))
        }
    }

    /// Write a file under the output root, creating parent directories.
    pub fn write(&self, filename: &str, content: &FileContent) -> io::Result<()> {
        let path = self.locate_output(filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content.as_bytes())
    }

    /// Remove the output directory and everything below it.
    pub fn clear_output(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.out_root) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Root-relative, forward-slash name for an absolute path under the
    /// source root. `None` if the path is outside the root or under the
    /// output subtree.
    pub fn relative_name(&self, path: &Path) -> Option<String> {
        if path.starts_with(&self.out_root) {
            return None;
        }
        let rel = path.strip_prefix(&self.src_root).ok()?;
        Some(normalize(rel))
    }
}

/// Convert a relative path to a forward-slash string.
pub fn normalize(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn workspace_in(temp: &TempDir) -> Workspace {
        let mut config = default_config();
        config.cwd = temp.path().to_path_buf();
        Workspace::from_config(&config)
    }

    #[test]
    fn test_is_binary_builtin_and_configured() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.cwd = temp.path().to_path_buf();
        config.binary_resource = vec!["psd".to_string()];
        let ws = Workspace::from_config(&config);

        assert!(ws.is_binary("img/logo.PNG"));
        assert!(ws.is_binary("art.psd"));
        assert!(!ws.is_binary("a.js"));
        assert!(!ws.is_binary("Makefile"));
    }

    #[test]
    fn test_roots_coincide() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.cwd = temp.path().to_path_buf();
        config.output = PathBuf::from(".");
        let ws = Workspace::from_config(&config);
        assert!(ws.roots_coincide());

        let ws = workspace_in(&temp);
        assert!(!ws.roots_coincide());
    }

    #[test]
    fn test_read_write_roundtrip() {
        let temp = TempDir::new().unwrap();
        let ws = workspace_in(&temp);
        std::fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let content = ws.read("a.txt").unwrap();
        assert_eq!(content.as_text(), Some("hello"));

        ws.write("sub/a.txt", &content).unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("output/sub/a.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_read_binary() {
        let temp = TempDir::new().unwrap();
        let ws = workspace_in(&temp);
        std::fs::write(temp.path().join("a.png"), [0u8, 159, 146]).unwrap();

        let content = ws.read("a.png").unwrap();
        assert_eq!(content.as_bytes(), &[0, 159, 146]);
        assert!(content.as_text().is_none());
    }

    #[test]
    fn test_relative_name_excludes_output() {
        let temp = TempDir::new().unwrap();
        let ws = workspace_in(&temp);

        let inside = temp.path().join("sub").join("a.js");
        assert_eq!(ws.relative_name(&inside), Some("sub/a.js".to_string()));

        let output = temp.path().join("output").join("a.js");
        assert_eq!(ws.relative_name(&output), None);

        assert_eq!(ws.relative_name(Path::new("/elsewhere/a.js")), None);
    }

    #[test]
    fn test_clear_output_missing_ok() {
        let temp = TempDir::new().unwrap();
        let ws = workspace_in(&temp);
        ws.clear_output().unwrap();

        std::fs::create_dir_all(temp.path().join("output/deep")).unwrap();
        ws.clear_output().unwrap();
        assert!(!temp.path().join("output").exists());
    }
}
