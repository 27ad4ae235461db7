//! Directory discovery: full expansion of the remote tree and the navigation table.
//!
//! The portal only reveals a folder's children once the folder is expanded, so
//! expansion repeats in waves until a snapshot shows nothing collapsed. The
//! settled snapshot is then turned into an ordered list of folders that have a
//! known destination.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::DirectoryMapping;
use crate::pacing::Pacer;
use crate::portal::{PortalDriver, TreeSnapshot};

/// Separator between the tree root and the folder path in a node id.
const ROOT_SEPARATOR: &str = "::";
/// Separator between folder levels in a node id.
const LEVEL_SEPARATOR: char = ':';

/// Skips a top-level folder, except for the listed second-level folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    /// Top-level folder name to skip.
    pub directory: String,
    /// Second-level folders under `directory` that are still visited.
    #[serde(default)]
    pub allow: Vec<String>,
}

impl ExclusionRule {
    /// Creates a rule excluding `directory` with the given exceptions.
    #[must_use]
    pub fn new(directory: impl Into<String>, allow: &[&str]) -> Self {
        Self {
            directory: directory.into(),
            allow: allow.iter().map(ToString::to_string).collect(),
        }
    }

    fn excludes(&self, node: &ParsedNode) -> bool {
        node.top_level == self.directory
            && !node
                .second_level
                .as_ref()
                .is_some_and(|second| self.allow.contains(second))
    }
}

/// A node id split into the parts the navigation table is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    /// Full node id.
    pub id: String,
    /// Number of `:` characters in the id; deeper folders have more.
    pub depth: usize,
    /// First folder level below the root.
    pub top_level: String,
    /// Second folder level, if any.
    pub second_level: Option<String>,
}

impl ParsedNode {
    /// Parses `<root>::<top>[:<second>[:...]]`.
    ///
    /// Returns `None` for ids without the root separator or with an empty
    /// top-level name.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        let (_, path) = id.split_once(ROOT_SEPARATOR)?;
        let mut levels = path.split(LEVEL_SEPARATOR);
        let top_level = levels.next().filter(|s| !s.is_empty())?.to_string();
        let second_level = levels.next().map(ToString::to_string);
        Some(Self {
            id: id.to_string(),
            depth: id.matches(LEVEL_SEPARATOR).count(),
            top_level,
            second_level,
        })
    }
}

/// One folder to visit and where its files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    /// Tree node id to open.
    pub node_id: String,
    /// Ordering depth (see [`ParsedNode::depth`]).
    pub depth: usize,
    /// Top-level folder name, used as the destination name in the log.
    pub top_level: String,
    /// Directory the folder's files are moved into.
    pub destination: PathBuf,
}

/// Bounds for the expansion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    /// Maximum expansion waves.
    pub max_rounds: u32,
    /// Pause after each click.
    pub settle: Duration,
    /// Pause after each wave.
    pub round_pause: Duration,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            settle: Duration::from_secs(1),
            round_pause: Duration::from_secs(2),
        }
    }
}

/// Expands every collapsed node until the tree stops revealing new ones.
///
/// Returns the settled snapshot.
///
/// # Errors
///
/// Returns [`Error::TreeNotSettled`] if collapsed nodes remain after
/// `policy.max_rounds` waves, or any driver error.
pub async fn expand_all<D: PortalDriver + ?Sized>(
    driver: &D,
    pacer: &dyn Pacer,
    policy: &ExpansionPolicy,
) -> Result<TreeSnapshot> {
    let mut rounds = 0;
    loop {
        let snapshot = driver.tree_snapshot().await?;
        let collapsed = snapshot.collapsed();
        if collapsed.is_empty() {
            log::info!(
                "Folder tree fully expanded: {} nodes after {rounds} rounds",
                snapshot.nodes.len()
            );
            return Ok(snapshot);
        }
        if rounds >= policy.max_rounds {
            return Err(Error::TreeNotSettled { rounds });
        }
        rounds += 1;
        log::debug!("Expansion round {rounds}: {} collapsed nodes", collapsed.len());
        for id in collapsed {
            driver.expand(id).await?;
            pacer.pause(policy.settle).await;
        }
        pacer.pause(policy.round_pause).await;
    }
}

/// Builds the ordered navigation table from a settled snapshot.
///
/// Nodes are deduplicated, filtered through `exclusions`, and joined against
/// `mapping`; unmapped folders are dropped. The result is sorted by top-level
/// name ascending, then by depth descending.
#[must_use]
pub fn navigation_table(
    snapshot: &TreeSnapshot,
    exclusions: &[ExclusionRule],
    mapping: &DirectoryMapping,
) -> Vec<NavigationEntry> {
    let mut seen = HashSet::new();
    let mut entries: Vec<NavigationEntry> = snapshot
        .ids()
        .filter(|id| seen.insert(*id))
        .filter_map(ParsedNode::parse)
        .filter(|node| !exclusions.iter().any(|rule| rule.excludes(node)))
        .filter_map(|node| {
            let Some(destination) = mapping.destination(&node.top_level) else {
                log::debug!("No destination for {}, skipping", node.id);
                return None;
            };
            Some(NavigationEntry {
                destination: destination.to_path_buf(),
                node_id: node.id,
                depth: node.depth,
                top_level: node.top_level,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.top_level
            .cmp(&b.top_level)
            .then_with(|| b.depth.cmp(&a.depth))
    });

    if entries.is_empty() {
        log::warn!("Navigation table is empty; nothing will be pulled");
    }
    entries
}

/// Expands the tree and builds the navigation table in one go.
///
/// # Errors
///
/// Returns any error from [`expand_all`].
pub async fn discover<D: PortalDriver + ?Sized>(
    driver: &D,
    pacer: &dyn Pacer,
    policy: &ExpansionPolicy,
    exclusions: &[ExclusionRule],
    mapping: &DirectoryMapping,
) -> Result<Vec<NavigationEntry>> {
    let snapshot = expand_all(driver, pacer, policy).await?;
    let table = navigation_table(&snapshot, exclusions, mapping);
    log::info!("{} folders to visit", table.len());
    Ok(table)
}
