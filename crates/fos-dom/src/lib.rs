//! fOS DOM - Document Object Model
//!
//! Arena document that the behavior runtime attaches to. Markup comes from the
//! HTML parser or a rendering layer; this crate stores it and exposes the
//! attribute, focus, popover, scheduling and form-control state that behaviors
//! read and mutate.

mod document;
mod dom_events;
mod forms;
mod fragment;
mod node;
mod tree;

pub use document::{Document, FrameHandle, ScrollAlign, ScrollRecord, Task};
pub use dom_events::{
    bubbles, cancelable, types, Event, EventPhase, Key, KeyModifiers, ListenerFn, ListenerId,
    ListenerOptions,
};
pub use forms::{FormData, ValidityState};
pub use fragment::{Fragment, FragmentNode};
pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::{Ancestors, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// DOM error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node {0:?} does not exist")]
    MissingNode(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Cannot insert {child:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
