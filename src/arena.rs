//! Generational slot arena holding every [TreeNode] of one tree.
//!
//! All indices in the crate (row lookup, path map, parent and child links) store [NodeId]s into
//! this arena. Reparenting is a matter of rewriting ids, and a stale id can never alias a newer
//! node because its generation no longer matches.

use std::ops::{Index, IndexMut};

use crate::node::{NodeId, TreeNode};

#[derive(Debug, Clone)]
struct Slot<R> {
    generation: u32,
    node: Option<TreeNode<R>>,
}

#[derive(Debug, Clone)]
pub struct NodeArena<R> {
    slots: Vec<Slot<R>>,
    free: Vec<u32>,
    len: usize,
}

impl<R> Default for NodeArena<R> {
    fn default() -> Self {
        NodeArena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<R> NodeArena<R> {
    pub fn new() -> NodeArena<R> {
        NodeArena::default()
    }

    pub fn insert(&mut self, node: TreeNode<R>) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<TreeNode<R>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode<R>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<R>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode<R>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut TreeNode<R>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.node.as_mut().map(|node| {
                    (
                        NodeId {
                            index: index as u32,
                            generation,
                        },
                        node,
                    )
                })
            })
    }
}

impl<R> Index<NodeId> for NodeArena<R> {
    type Output = TreeNode<R>;

    fn index(&self, id: NodeId) -> &TreeNode<R> {
        self.get(id)
            .unwrap_or_else(|| panic!("stale or unknown node id {id}"))
    }
}

impl<R> IndexMut<NodeId> for NodeArena<R> {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode<R> {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("stale or unknown node id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RowId;

    #[test]
    fn test_removed_slot_is_reused_with_new_generation() {
        let mut arena = NodeArena::<u32>::new();
        let a = arena.insert(TreeNode::row(RowId::from("a"), 1, 0));
        let b = arena.insert(TreeNode::row(RowId::from("b"), 2, 1));
        assert_eq!(arena.len(), 2);

        let removed = arena.remove(a).expect("a is live");
        assert_eq!(removed.id().as_str(), "a");
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());

        let c = arena.insert(TreeNode::row(RowId::from("c"), 3, 2));
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(arena.get(a).is_none(), "stale id must not alias the new node");
        assert_eq!(arena[c].data(), Some(&3));
        assert_eq!(arena[b].data(), Some(&2));
        assert_eq!(arena.iter().count(), 2);
    }
}
