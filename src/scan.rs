//! Content directory scanning.
//!
//! Stage 1 of the build pipeline. Mirrors the content directory into a
//! [`RouteTree`], one node per file or directory, with front matter decoded
//! onto every node that has a backing file.
//!
//! ## Directory Structure
//!
//! ```text
//! content/
//! ├── index.md                 # Root page → /
//! ├── about.md                 # Page → /about
//! ├── blog/
//! │   ├── index.html           # Directory page → /blog
//! │   ├── hello.md             # Page → /blog/hello
//! │   └── [slug].md            # Dynamic page → one route per slug value
//! ├── drafts/                  # No index file: structural only
//! │   └── wip.md               # Page → /drafts/wip
//! └── static/
//!     └── logo.png             # Asset → copied to /static/logo.png
//! ```
//!
//! ## Rules
//!
//! - Any entry named `index.*` is its directory's own content file. Authors
//!   should keep exactly one per directory; with several, the last one in
//!   name order wins.
//! - Entries are visited in file-name order. Dot-files are skipped.
//! - A file whose first line is `---` has its front matter decoded; a decode
//!   failure aborts the scan.

use crate::frontmatter;
use crate::route::{Metadata, Route, RouteId, RouteTree, file_href, join_href};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Content directory not found: {0}")]
    MissingContentDir(PathBuf),
}

/// Build the route tree for a content directory.
pub fn load_routes(content_dir: &Path) -> Result<RouteTree, ScanError> {
    if !content_dir.is_dir() {
        return Err(ScanError::MissingContentDir(content_dir.to_path_buf()));
    }
    let mut tree = RouteTree::new(content_dir);
    let root = tree.root();
    scan_directory(&mut tree, root, content_dir, "/")?;
    tracing::debug!(routes = tree.walk().len(), dir = %content_dir.display(), "scanned content");
    Ok(tree)
}

/// Populate the directory node `id` from the directory at `path`.
fn scan_directory(
    tree: &mut RouteTree,
    id: RouteId,
    path: &Path,
    rel_href: &str,
) -> Result<(), ScanError> {
    for entry in collect_entries(path)? {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let child_href = join_href(rel_href, &name);

        if entry.is_dir() {
            let child = tree.push_child(id, Route::directory());
            scan_directory(tree, child, &entry, &child_href)?;
        } else if is_index_file(&name) {
            let front_matter = read_front_matter(&entry)?;
            let index = Route::file(entry, rel_href.to_string(), front_matter);
            let node = tree.get_mut(id);
            let children = std::mem::take(&mut node.children);
            *node = Route { children, ..index };
        } else {
            let front_matter = read_front_matter(&entry)?;
            tree.push_child(id, Route::file(entry, file_href(&child_href), front_matter));
        }
    }
    Ok(())
}

fn collect_entries(path: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let read_err = |source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if !entry.file_name().to_string_lossy().starts_with('.') {
            entries.push(entry.path());
        }
    }
    entries.sort();
    Ok(entries)
}

fn is_index_file(name: &str) -> bool {
    name.starts_with("index.")
}

/// Decode the file's front matter, if it has any. Only the first few bytes
/// are read for files without it, so large assets are never loaded.
fn read_front_matter(path: &Path) -> Result<Metadata, ScanError> {
    let read_err = |source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut head = [0u8; 5];
    let mut file = File::open(path).map_err(read_err)?;
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..]).map_err(read_err)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if !frontmatter::has_front_matter(&head[..filled]) {
        return Ok(Metadata::new());
    }

    let mut bytes = head[..filled].to_vec();
    file.read_to_end(&mut bytes).map_err(read_err)?;
    let content = String::from_utf8(bytes)
        .map_err(|e| read_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let (block, _) = frontmatter::split(&content);
    frontmatter::decode(block.unwrap_or_default()).map_err(|source| ScanError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })
}
