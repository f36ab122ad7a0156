//! Loading a source file into memory.

use crate::error::CompileError;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// The whole contents of one BF source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl SourceFile {
    pub fn open(path: impl AsRef<Path>) -> Result<SourceFile, CompileError> {
        let path = path.as_ref();
        let display = path.display();

        let mut file = fs::File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                CompileError::io(format!("No such file or directory: '{}'", display), e)
            }
            _ => CompileError::io(format!("Unable to open file '{}'!", display), e),
        })?;

        let len = file
            .metadata()
            .map_err(|e| CompileError::io("Unable to seek the end of file!", e))?
            .len();
        // Guard against sizes a signed size cannot represent.
        if len > isize::MAX as u64 {
            return Err(CompileError::Io {
                message: "Invalid file size!".to_owned(),
                source: None,
            });
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len as usize)?;
        file.read_to_end(&mut bytes)
            .map_err(|e| CompileError::io(format!("Unable to read from file '{}'!", display), e))?;

        Ok(SourceFile {
            path: path.to_owned(),
            bytes,
        })
    }

    /// Wrap bytes that did not come from disk.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> SourceFile {
        SourceFile {
            path: path.into(),
            bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The final path component, as shown in diagnostics.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The text of the 1-based line `n`, without its terminator.
    pub fn line(&self, n: usize) -> Option<String> {
        if n == 0 {
            return None;
        }
        self.bytes
            .split(|&b| b == b'\n')
            .nth(n - 1)
            .map(|line| String::from_utf8_lossy(line).into_owned())
    }
}

#[test]
fn line_lookup_is_one_based() {
    let source = SourceFile::from_bytes("a.bf", b"+\n-[\n\n]".to_vec());
    assert_eq!(source.line(0), None);
    assert_eq!(source.line(1).as_deref(), Some("+"));
    assert_eq!(source.line(2).as_deref(), Some("-["));
    assert_eq!(source.line(3).as_deref(), Some(""));
    assert_eq!(source.line(4).as_deref(), Some("]"));
    assert_eq!(source.line(5), None);
}

#[test]
fn name_strips_directories() {
    let source = SourceFile::from_bytes("some/where/hello.bf", vec![]);
    assert_eq!(source.name(), "hello.bf");
}

#[test]
fn open_missing_file() {
    let err = SourceFile::open("/definitely/not/here.bf").unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    assert_eq!(
        err.to_string(),
        "No such file or directory: '/definitely/not/here.bf'"
    );
}
