//! Specialized collection types

pub use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable key for a node (camera or light) attached to a renderer scene
    pub struct NodeKey;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<NodeKey, T>;
