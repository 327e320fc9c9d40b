//! Read-only file trees
//!
//! A tree is an arena of nodes in pre-order. Every node records how many
//! nodes its subtree holds, so skipping a subtree or listing a directory's
//! children is index arithmetic; nothing is nested by ownership.

use crate::error::{ArchiveError, ArchiveResult};
use std::collections::HashMap;
use tibread_formats::Timestamp;
use tibread_formats::sequenced::ListingEntry;
use tibread_formats::sidecar::{BoxHandle, EntryKind, FileEntry};

/// Index of a node within its tree
pub type NodeId = usize;

/// What a node describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Top-level volume root
    Root,
    /// Directory
    Directory,
    /// Regular file
    File,
}

/// Where a regular file's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    /// No content (directories)
    None,
    /// Dialect A blob handles, in read order
    Boxes(Vec<BoxHandle>),
    /// Dialect B metadata records starting at an archive-relative offset
    Records {
        /// Offset of the first metadata record
        meta_offset: u64,
    },
}

/// One file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Entry name
    pub name: String,
    /// Entry type
    pub kind: NodeKind,
    /// Logical size in bytes
    pub size: u64,
    /// Modification time
    pub mtime: Timestamp,
    /// Enclosing directory
    pub parent: Option<NodeId>,
    /// Nodes in this node's subtree, itself excluded
    pub subtree_len: usize,
    /// Content location
    pub content: ContentRef,
}

impl Node {
    /// Whether the node can hold children
    pub const fn is_dir(&self) -> bool {
        !matches!(self.kind, NodeKind::File)
    }
}

/// Arena of nodes in pre-order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    nodes: Vec<Node>,
}

impl FileTree {
    /// Build from dialect A file entries
    ///
    /// Each directory's entry count must fit inside its parent's subtree.
    pub fn from_entries(entries: &[FileEntry]) -> ArchiveResult<Self> {
        let mut nodes = Vec::with_capacity(entries.len());
        // (index, end) of each open directory
        let mut open: Vec<(NodeId, usize)> = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            while open.last().is_some_and(|&(_, end)| end <= index) {
                open.pop();
            }
            let parent = open.last().map(|&(id, _)| id);
            let limit = open.last().map_or(entries.len(), |&(_, end)| end);

            let count = entry.num_entries();
            let end = index + 1 + count as usize;
            if end > limit {
                return Err(ArchiveError::TreeOverrun { index, count });
            }

            let (kind, content) = match entry.kind {
                EntryKind::Root { .. } => (NodeKind::Root, ContentRef::None),
                EntryKind::Directory { .. } => (NodeKind::Directory, ContentRef::None),
                EntryKind::Regular => (
                    NodeKind::File,
                    ContentRef::Boxes(entry.blob_handles().copied().collect()),
                ),
            };
            if kind != NodeKind::File {
                open.push((index, end));
            }

            nodes.push(Node {
                name: entry.name.clone(),
                kind,
                size: entry.size,
                mtime: entry.mtime,
                parent,
                subtree_len: count as usize,
                content,
            });
        }

        Ok(Self { nodes })
    }

    /// Build from a dialect B listing
    ///
    /// Paths are split on either slash. Directories missing from the listing
    /// are synthesised. Everything hangs below a single unnamed root.
    pub fn from_listing(entries: &[ListingEntry]) -> Self {
        struct Draft {
            name: String,
            entry: Option<usize>,
            children: Vec<usize>,
        }

        let mut drafts = vec![Draft {
            name: String::new(),
            entry: None,
            children: Vec::new(),
        }];
        let mut by_name: HashMap<(usize, String), usize> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            let mut at = 0;
            for part in entry.path.split(['\\', '/']).filter(|p| !p.is_empty()) {
                at = match by_name.get(&(at, part.to_string())) {
                    Some(&child) => child,
                    None => {
                        let child = drafts.len();
                        drafts.push(Draft {
                            name: part.to_string(),
                            entry: None,
                            children: Vec::new(),
                        });
                        drafts[at].children.push(child);
                        by_name.insert((at, part.to_string()), child);
                        child
                    }
                };
            }
            if at != 0 {
                drafts[at].entry = Some(index);
            }
        }

        // Flatten to pre-order
        let mut nodes: Vec<Node> = Vec::with_capacity(drafts.len());
        let mut stack: Vec<(usize, Option<NodeId>)> = vec![(0, None)];
        while let Some((draft_id, parent)) = stack.pop() {
            let draft = &drafts[draft_id];
            let id = nodes.len();
            let listed = draft.entry.map(|i| &entries[i]);

            let kind = match listed {
                _ if draft_id == 0 => NodeKind::Root,
                Some(entry) if !entry.is_dir() && draft.children.is_empty() => NodeKind::File,
                _ => NodeKind::Directory,
            };
            let content = match (kind, listed) {
                (NodeKind::File, Some(entry)) => ContentRef::Records {
                    meta_offset: entry.meta_offset,
                },
                _ => ContentRef::None,
            };

            nodes.push(Node {
                name: draft.name.clone(),
                kind,
                size: listed.map_or(0, |e| if kind == NodeKind::File { e.size } else { 0 }),
                mtime: listed.map_or(Timestamp::from_millis(0), |e| e.time),
                parent,
                subtree_len: 0,
                content,
            });
            for &child in draft.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        // Subtree sizes, children before parents
        for id in (0..nodes.len()).rev() {
            if let Some(parent) = nodes[id].parent {
                nodes[parent].subtree_len += nodes[id].subtree_len + 1;
            }
        }

        Self { nodes }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// First node after `id`'s subtree
    pub fn skip_subtree(&self, id: NodeId) -> NodeId {
        self.nodes
            .get(id)
            .map_or(self.nodes.len(), |node| id + 1 + node.subtree_len)
    }

    /// Top-level nodes
    pub fn roots(&self) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: 0,
            end: self.nodes.len(),
        }
    }

    /// Immediate children of a node
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        let end = self.skip_subtree(id);
        Siblings {
            tree: self,
            next: (id + 1).min(end),
            end,
        }
    }

    /// Resolve a slash-delimited path
    ///
    /// The path is taken relative to the first top-level node, so `/` is that
    /// node itself. Returns `None` when a component is missing or a non-final
    /// component is not a directory.
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        let mut at = self.roots().next()?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !self.nodes[at].is_dir() {
                return None;
            }
            at = self.children(at).find(|&child| self.nodes[child].name == part)?;
        }
        Some(at)
    }

    /// Path of a node below the first top-level node
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut parts = Vec::new();
        let mut at = self.nodes.get(id)?;
        while let Some(parent) = at.parent {
            parts.push(at.name.as_str());
            at = &self.nodes[parent];
        }
        parts.reverse();
        Some(format!("/{}", parts.join("/")))
    }
}

/// Iterator over nodes sharing a parent
#[derive(Debug, Clone)]
pub struct Siblings<'a> {
    tree: &'a FileTree,
    next: NodeId,
    end: NodeId,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next >= self.end {
            return None;
        }
        let id = self.next;
        self.next = self.tree.skip_subtree(id);
        Some(id)
    }
}
