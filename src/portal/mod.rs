//! Remote portal abstraction.
//!
//! The workflow only sees the portal through [`PortalDriver`], which hands back
//! structured snapshots instead of raw markup. [`SftPortal`] is the WebDriver
//! backed implementation; all knowledge of the portal's HTML lives in
//! [`markup`].

pub mod markup;
mod sft;
pub mod webdriver;

use async_trait::async_trait;

use crate::error::Result;

pub use sft::{SftPortal, TREE_ROOT_ID};
pub use webdriver::WebDriverSession;

/// One folder node of the remote directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    /// Opaque node identifier, e.g. `allFiles_Tree::LabA:Runs`.
    pub id: String,
    /// Whether the node's children are currently revealed.
    pub expanded: bool,
}

impl FolderNode {
    /// Creates a node.
    #[must_use]
    pub fn new(id: impl Into<String>, expanded: bool) -> Self {
        Self {
            id: id.into(),
            expanded,
        }
    }
}

/// The folder tree as rendered at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Nodes in document order.
    pub nodes: Vec<FolderNode>,
}

impl TreeSnapshot {
    /// Ids of nodes that still need expanding.
    #[must_use]
    pub fn collapsed(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| !n.expanded)
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Returns true when no node is left collapsed.
    #[must_use]
    pub fn is_fully_expanded(&self) -> bool {
        self.nodes.iter().all(|n| n.expanded)
    }

    /// Iterates over all node ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}

/// Kind of an entry inside an opened folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A nested folder.
    Folder,
    /// A downloadable file.
    File,
}

/// One row of an opened folder's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// Element id; for files this is also the file name.
    pub id: String,
    /// Folder or file.
    pub kind: EntryKind,
}

impl FolderEntry {
    /// Classifies a listing id: folder ids start with `:`.
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        let kind = if id.starts_with(':') {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        Self { id, kind }
    }

    /// Returns true for nested folders.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Splits a listing into `(folders, files)`, keeping the listing order.
#[must_use]
pub fn partition_entries(entries: Vec<FolderEntry>) -> (Vec<FolderEntry>, Vec<FolderEntry>) {
    entries.into_iter().partition(FolderEntry::is_folder)
}

/// Operations the workflow needs from the remote portal.
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Returns the current state of the folder tree.
    async fn tree_snapshot(&self) -> Result<TreeSnapshot>;

    /// Expands (reveals the children of) a tree node.
    async fn expand(&self, node_id: &str) -> Result<()>;

    /// Opens a tree node so its contents are listed.
    async fn open_folder(&self, node_id: &str) -> Result<()>;

    /// Lists the contents of the currently opened folder.
    async fn folder_contents(&self) -> Result<Vec<FolderEntry>>;

    /// Starts downloading an entry into the browser's download directory.
    async fn download(&self, entry_id: &str) -> Result<()>;

    /// Deletes an entry from the portal.
    async fn delete(&self, entry_id: &str) -> Result<()>;

    /// Ends the session.
    async fn close(&self) -> Result<()>;
}
