//! In-memory portal used by the discovery and workflow tests.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::portal::{FolderEntry, FolderNode, PortalDriver, TREE_ROOT_ID, TreeSnapshot};

#[derive(Debug, Default)]
struct FakeFolder {
    expanded: bool,
    stuck: bool,
    files: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    folders: BTreeMap<String, FakeFolder>,
    current: Option<String>,
    staging: Option<PathBuf>,
    lost_downloads: HashSet<String>,
    expansions: usize,
    actions: Vec<String>,
    closed: bool,
}

impl FakeState {
    /// A folder is rendered once every ancestor is present and expanded.
    fn is_visible(&self, path: &str) -> bool {
        path.match_indices(':')
            .all(|(i, _)| self.folders.get(&path[..i]).is_some_and(|f| f.expanded))
    }
}

/// Lazily revealed folder tree whose downloads land in a real staging directory.
///
/// Folder paths are given without the tree root, e.g. `LabA:Runs`.
#[derive(Debug, Default)]
pub(crate) struct FakePortal {
    state: Mutex<FakeState>,
}

fn strip_root(node_id: &str) -> &str {
    node_id.strip_prefix(TREE_ROOT_ID).unwrap_or(node_id)
}

impl FakePortal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn folder(mut self, path: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .folders
            .entry(path.to_string())
            .or_default();
        self
    }

    /// Makes a folder ignore expansion clicks.
    pub(crate) fn stuck(mut self, path: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .folders
            .entry(path.to_string())
            .or_default()
            .stuck = true;
        self
    }

    pub(crate) fn file(mut self, path: &str, name: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .folders
            .entry(path.to_string())
            .or_default()
            .files
            .push(name.to_string());
        self
    }

    pub(crate) fn staging(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state.get_mut().unwrap().staging = Some(dir.into());
        self
    }

    /// Downloads of `name` are accepted but never arrive.
    pub(crate) fn lost_download(mut self, name: &str) -> Self {
        self.state
            .get_mut()
            .unwrap()
            .lost_downloads
            .insert(name.to_string());
        self
    }

    pub(crate) fn expansions(&self) -> usize {
        self.state.lock().unwrap().expansions
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl PortalDriver for FakePortal {
    async fn tree_snapshot(&self) -> Result<TreeSnapshot> {
        let state = self.state.lock().unwrap();
        let nodes = state
            .folders
            .iter()
            .filter(|(path, _)| state.is_visible(path))
            .map(|(path, f)| FolderNode::new(format!("{TREE_ROOT_ID}{path}"), f.expanded))
            .collect();
        Ok(TreeSnapshot { nodes })
    }

    async fn expand(&self, node_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.expansions += 1;
        let folder = state
            .folders
            .get_mut(strip_root(node_id))
            .ok_or_else(|| Error::Driver(format!("no such element: {node_id}")))?;
        if !folder.stuck {
            folder.expanded = true;
        }
        Ok(())
    }

    async fn open_folder(&self, node_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let path = strip_root(node_id).to_string();
        if !state.folders.contains_key(&path) {
            return Err(Error::Driver(format!("no such element: {node_id}")));
        }
        state.actions.push(format!("open {path}"));
        state.current = Some(path);
        Ok(())
    }

    async fn folder_contents(&self) -> Result<Vec<FolderEntry>> {
        let state = self.state.lock().unwrap();
        let Some(current) = state.current.as_deref() else {
            return Ok(Vec::new());
        };
        let prefix = format!("{current}:");
        let mut entries: Vec<FolderEntry> = state
            .folders
            .keys()
            .filter(|path| path.strip_prefix(&prefix).is_some_and(|rest| !rest.contains(':')))
            .map(|path| FolderEntry::from_id(format!(":{path}")))
            .collect();
        if let Some(folder) = state.folders.get(current) {
            entries.extend(folder.files.iter().map(FolderEntry::from_id));
        }
        Ok(entries)
    }

    async fn download(&self, entry_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("download {entry_id}"));
        if state.lost_downloads.contains(entry_id) {
            return Ok(());
        }
        let staging = state
            .staging
            .clone()
            .ok_or_else(|| Error::Driver("no download directory".to_string()))?;
        std::fs::write(staging.join(entry_id), format!("contents of {entry_id}"))?;
        Ok(())
    }

    async fn delete(&self, entry_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("delete {entry_id}"));
        if let Some(path) = entry_id.strip_prefix(':') {
            let nested = format!("{path}:");
            state
                .folders
                .retain(|p, _| p != path && !p.starts_with(&nested));
        } else if let Some(current) = state.current.clone()
            && let Some(folder) = state.folders.get_mut(&current)
        {
            folder.files.retain(|f| f != entry_id);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
