//! Selection graphs describing how to walk the inventory.
//!
//! The property collector walks the containment hierarchy server-side,
//! following a declarative selection graph: each node says "from objects of
//! type T, follow property P, then apply these child nodes". Recursion is
//! expressed by a node listing itself (or an ancestor) as a child, so the
//! graph is cyclic and is never flattened into a tree.
//!
//! # Design
//!
//! Nodes live in an arena ([`SelectionGraph`]) and are addressed by
//! [`NodeId`]. Children are stored as ids, and every node also has a name
//! registered in a lookup table, which is how back-references are written on
//! the wire. A node may be referenced before it is defined:
//!
//! ```
//! use vw_watcher::SelectionGraphBuilder;
//!
//! let mut builder = SelectionGraphBuilder::new();
//! let folders = builder.node("traverseFolders");
//! builder.traverse(folders, "Folder", "childEntity", &[folders]);
//! builder.entry(folders);
//!
//! let graph = builder.build()?;
//! assert_eq!(graph.children(folders), &[folders]);
//! # Ok::<(), vw_watcher::TraversalError>(())
//! ```
//!
//! # Standard VM traversal
//!
//! ```text
//! root folder
//!   └─► traverseFolders (Folder.childEntity) ◄──────────────┐
//!         ├─► traverseFolders (self)                         │
//!         └─► traverseDatacenterVmFolder (Datacenter.vmFolder)
//!               └─► traverseFolders ─────────────────────────┘
//! ```

use smallvec::SmallVec;
use vw_core::{CHILD_ENTITY, DATACENTER, FOLDER, FxHashMap, VM_FOLDER, fx_hash_map};

use crate::error::TraversalError;

/// Handle to a node in a [`SelectionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index of this node.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionNode {
    /// Name other nodes use to refer back to this one.
    pub name: String,

    /// Managed object type this step applies to.
    pub kind: String,

    /// Property to follow from objects of `kind`.
    pub path: String,

    /// When set, objects reached by this step are traversed but not
    /// themselves reported.
    pub skip: bool,

    /// Child steps applied to the objects reached, in order.
    pub select_set: SmallVec<[NodeId; 4]>,
}

/// An immutable, possibly cyclic selection graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionGraph {
    nodes: Vec<SelectionNode>,
    names: FxHashMap<String, NodeId>,
    entries: SmallVec<[NodeId; 2]>,
}

impl SelectionGraph {
    /// Returns the node for `id`, if it belongs to this graph.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SelectionNode> {
        self.nodes.get(id.index())
    }

    /// Looks up a node by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Returns the nodes applied at the root object.
    #[must_use]
    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    /// Returns the children of `id`, or an empty slice for a foreign id.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |node| node.select_set.as_slice())
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SelectionNode)> {
        (0u32..).map(NodeId).zip(self.nodes.iter())
    }
}

#[derive(Debug)]
struct Slot {
    name: String,
    definition: Option<Definition>,
}

#[derive(Debug)]
struct Definition {
    kind: String,
    path: String,
    skip: bool,
    select_set: SmallVec<[NodeId; 4]>,
}

/// Builder for [`SelectionGraph`].
///
/// Nodes are declared by name with [`node`](Self::node), defined with
/// [`traverse`](Self::traverse), and validated by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct SelectionGraphBuilder {
    slots: Vec<Slot>,
    names: FxHashMap<String, NodeId>,
    entries: SmallVec<[NodeId; 2]>,
    redefined: Option<String>,
}

impl SelectionGraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: fx_hash_map(),
            ..Self::default()
        }
    }

    /// Returns the id for `name`, declaring the node if it is new.
    pub fn node(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = NodeId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
        self.slots.push(Slot {
            name: name.to_owned(),
            definition: None,
        });
        self.names.insert(name.to_owned(), id);
        id
    }

    /// Defines node `id`: from objects of `kind`, follow `path`, then apply
    /// `select_set` in order.
    pub fn traverse(&mut self, id: NodeId, kind: &str, path: &str, select_set: &[NodeId]) -> &mut Self {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.definition.is_some() {
                self.redefined.get_or_insert_with(|| slot.name.clone());
            } else {
                slot.definition = Some(Definition {
                    kind: kind.to_owned(),
                    path: path.to_owned(),
                    skip: false,
                    select_set: SmallVec::from_slice(select_set),
                });
            }
        }
        self
    }

    /// Marks node `id` as skipped: reached objects are walked through but
    /// not reported.
    pub fn skip(&mut self, id: NodeId) -> &mut Self {
        if let Some(definition) = self
            .slots
            .get_mut(id.index())
            .and_then(|slot| slot.definition.as_mut())
        {
            definition.skip = true;
        }
        self
    }

    /// Adds `id` to the nodes applied at the root object.
    pub fn entry(&mut self, id: NodeId) -> &mut Self {
        if !self.entries.contains(&id) {
            self.entries.push(id);
        }
        self
    }

    /// Validates and freezes the graph.
    pub fn build(self) -> Result<SelectionGraph, TraversalError> {
        if let Some(name) = self.redefined {
            return Err(TraversalError::Redefined(name));
        }
        if self.entries.is_empty() {
            return Err(TraversalError::NoEntry);
        }

        let len = self.slots.len();
        let dangling = |id: NodeId| id.index() >= len;
        if let Some(id) = self.entries.iter().find(|id| dangling(**id)) {
            return Err(TraversalError::Undefined(format!("#{}", id.index())));
        }

        let mut nodes = Vec::with_capacity(len);
        for slot in self.slots {
            let Some(definition) = slot.definition else {
                return Err(TraversalError::Undefined(slot.name));
            };
            if let Some(id) = definition.select_set.iter().find(|id| dangling(**id)) {
                return Err(TraversalError::Undefined(format!("#{}", id.index())));
            }
            nodes.push(SelectionNode {
                name: slot.name,
                kind: definition.kind,
                path: definition.path,
                skip: definition.skip,
                select_set: definition.select_set,
            });
        }

        Ok(SelectionGraph {
            nodes,
            names: self.names,
            entries: self.entries,
        })
    }
}

/// Builds the selection graphs used by the watcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalSpecBuilder;

impl TraversalSpecBuilder {
    /// Name of the recursive folder step.
    pub const TRAVERSE_FOLDERS: &'static str = "traverseFolders";

    /// Name of the datacenter-to-VM-folder step.
    pub const TRAVERSE_DATACENTER_VM_FOLDER: &'static str = "traverseDatacenterVmFolder";

    /// Returns the graph reaching every virtual machine below the root
    /// folder, through arbitrarily nested folders and each datacenter's VM
    /// folder.
    pub fn virtual_machines() -> Result<SelectionGraph, TraversalError> {
        let mut builder = SelectionGraphBuilder::new();
        let folders = builder.node(Self::TRAVERSE_FOLDERS);
        let datacenters = builder.node(Self::TRAVERSE_DATACENTER_VM_FOLDER);

        builder
            .traverse(folders, FOLDER, CHILD_ENTITY, &[folders, datacenters])
            .traverse(datacenters, DATACENTER, VM_FOLDER, &[folders])
            .entry(folders);

        builder.build()
    }
}
