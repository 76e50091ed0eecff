// Filesystem tools: read, write, list, create and delete paths

use crate::executor::tool::{ToolImpl, parse_input};
use crate::executor::{ExecutorError, Result, ToolOutput};
use crate::protocol::{InputShape, ParamKind, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// Build the filesystem tool set
pub fn tools() -> Vec<Arc<dyn ToolImpl>> {
    vec![
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(ListDirectoryTool),
        Arc::new(CreateDirectoryTool),
        Arc::new(DeleteFileTool),
    ]
}

/// Home directory used for `~` expansion
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/home"))
}

/// Expand a leading `~`, make absolute and fold `.`/`..` lexically
///
/// This narrows traversal tricks in the path text; it does not confine
/// access to any directory.
pub fn normalize_path(raw: &str) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    normalize_path_with(raw, &home_dir(), &cwd)
}

/// [`normalize_path`] with explicit home and working directories
pub fn normalize_path_with(raw: &str, home: &Path, cwd: &Path) -> PathBuf {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) => home.join(rest.trim_start_matches('/')),
        None => PathBuf::from(raw),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

#[derive(Debug, Deserialize)]
struct PathInput {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteInput {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct DeleteInput {
    path: String,
    #[serde(default)]
    recursive: bool,
}

/// `read_file`
pub struct ReadFileTool;

#[async_trait]
impl ToolImpl for ReadFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "read_file".to_string(),
            description: "Read the contents of a file".to_string(),
            input_schema: InputShape::new().required(
                "path",
                ParamKind::String,
                "Path to the file to read",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let PathInput { path } = parse_input("read_file", input)?;
        let path = normalize_path(&path);

        debug!(path = %path.display(), "reading file");
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ExecutorError::filesystem("read file", e))?;

        Ok(ToolOutput::success(content))
    }
}

/// `write_file`: creates missing parent directories
pub struct WriteFileTool;

#[async_trait]
impl ToolImpl for WriteFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "write_file".to_string(),
            description: "Write content to a file".to_string(),
            input_schema: InputShape::new()
                .required("path", ParamKind::String, "Path to the file to write")
                .required(
                    "content",
                    ParamKind::String,
                    "Content to write to the file",
                ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let WriteInput { path, content } = parse_input("write_file", input)?;
        let path = normalize_path(&path);

        if let Some(parent) = path.parent()
            && !fs::try_exists(parent).await.unwrap_or(false)
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ExecutorError::filesystem("write file", e))?;
        }

        fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| ExecutorError::filesystem("write file", e))?;

        info!(path = %path.display(), bytes = content.len(), "file written");
        Ok(ToolOutput::success(format!(
            "Successfully wrote to {}",
            path.display()
        )))
    }
}

/// Result body of `list_directory`
#[derive(Debug, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub directories: Vec<String>,
    pub files: Vec<String>,
    pub path: String,
}

/// `list_directory`: names of files and subdirectories, sorted
pub struct ListDirectoryTool;

#[async_trait]
impl ToolImpl for ListDirectoryTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "list_directory".to_string(),
            description: "List the contents of a directory".to_string(),
            input_schema: InputShape::new().required(
                "path",
                ParamKind::String,
                "Path to the directory to list",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let PathInput { path } = parse_input("list_directory", input)?;
        let path = normalize_path(&path);

        let mut entries = fs::read_dir(&path)
            .await
            .map_err(|e| ExecutorError::filesystem("list directory", e))?;

        let mut directories = Vec::new();
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ExecutorError::filesystem("list directory", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ExecutorError::filesystem("list directory", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if file_type.is_dir() {
                directories.push(name);
            } else if file_type.is_file() {
                files.push(name);
            }
        }
        directories.sort();
        files.sort();

        let listing = DirectoryListing {
            directories,
            files,
            path: path.display().to_string(),
        };
        Ok(ToolOutput::success(serde_json::to_string_pretty(&listing)?))
    }
}

/// `create_directory`: recursive, succeeds if it already exists
pub struct CreateDirectoryTool;

#[async_trait]
impl ToolImpl for CreateDirectoryTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "create_directory".to_string(),
            description: "Create a new directory".to_string(),
            input_schema: InputShape::new().required(
                "path",
                ParamKind::String,
                "Path to the directory to create",
            ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let PathInput { path } = parse_input("create_directory", input)?;
        let path = normalize_path(&path);

        fs::create_dir_all(&path)
            .await
            .map_err(|e| ExecutorError::filesystem("create directory", e))?;

        info!(path = %path.display(), "directory created");
        Ok(ToolOutput::success(format!(
            "Successfully created directory {}",
            path.display()
        )))
    }
}

/// `delete_file`: files, empty directories, or whole trees with `recursive`
pub struct DeleteFileTool;

#[async_trait]
impl ToolImpl for DeleteFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "delete_file".to_string(),
            description: "Delete a file or directory".to_string(),
            input_schema: InputShape::new()
                .required(
                    "path",
                    ParamKind::String,
                    "Path to the file or directory to delete",
                )
                .optional(
                    "recursive",
                    ParamKind::Boolean,
                    "If true, recursively delete directories",
                ),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let DeleteInput { path, recursive } = parse_input("delete_file", input)?;
        let path = normalize_path(&path);

        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| ExecutorError::filesystem("delete", e))?;

        let removed = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_dir(&path).await
            }
        } else {
            fs::remove_file(&path).await
        };
        removed.map_err(|e| ExecutorError::filesystem("delete", e))?;

        info!(path = %path.display(), recursive = recursive, "path deleted");
        Ok(ToolOutput::success(format!(
            "Successfully deleted {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tilde_expands_to_home() {
        let home = Path::new("/home/alice");
        let cwd = Path::new("/work");
        assert_eq!(
            normalize_path_with("~/notes.txt", home, cwd),
            PathBuf::from("/home/alice/notes.txt")
        );
        assert_eq!(normalize_path_with("~", home, cwd), PathBuf::from("/home/alice"));
    }

    #[test]
    fn test_relative_resolved_against_cwd() {
        let home = Path::new("/home/alice");
        let cwd = Path::new("/work/project");
        assert_eq!(
            normalize_path_with("src/../README.md", home, cwd),
            PathBuf::from("/work/project/README.md")
        );
    }

    #[test]
    fn test_parent_never_escapes_root() {
        let home = Path::new("/home/alice");
        let cwd = Path::new("/");
        assert_eq!(
            normalize_path_with("/../../etc/./passwd", home, cwd),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn test_tilde_matches_manual_substitution() {
        let home = Path::new("/home/alice");
        let cwd = Path::new("/work");
        assert_eq!(
            normalize_path_with("~/a/./b/../c", home, cwd),
            normalize_path_with("/home/alice/a/./b/../c", home, cwd)
        );
    }
}
