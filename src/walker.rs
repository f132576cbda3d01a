use core::fmt;

use crate::level::ContextLevel;
use crate::pdata::Profiles;

/// Position of a resource, scope or profile inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Resource {
        resource: usize,
    },
    Scope {
        resource: usize,
        scope: usize,
    },
    Profile {
        resource: usize,
        scope: usize,
        profile: usize,
    },
}

impl NodeId {
    pub fn level(&self) -> ContextLevel {
        match self {
            NodeId::Resource { .. } => ContextLevel::Resource,
            NodeId::Scope { .. } => ContextLevel::Scope,
            NodeId::Profile { .. } => ContextLevel::Profile,
        }
    }

    pub fn resource_index(&self) -> usize {
        match *self {
            NodeId::Resource { resource }
            | NodeId::Scope { resource, .. }
            | NodeId::Profile { resource, .. } => resource,
        }
    }

    /// The enclosing node at `level`, or `None` when `level` is below this node.
    pub fn ancestor(&self, level: ContextLevel) -> Option<NodeId> {
        match (*self, level) {
            (node, level) if node.level() == level => Some(node),
            (NodeId::Scope { resource, .. }, ContextLevel::Resource)
            | (NodeId::Profile { resource, .. }, ContextLevel::Resource) => {
                Some(NodeId::Resource { resource })
            }
            (NodeId::Profile { resource, scope, .. }, ContextLevel::Scope) => {
                Some(NodeId::Scope { resource, scope })
            }
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeId::Resource { resource } => write!(f, "resource[{}]", resource),
            NodeId::Scope { resource, scope } => {
                write!(f, "resource[{}]/scope[{}]", resource, scope)
            }
            NodeId::Profile {
                resource,
                scope,
                profile,
            } => write!(
                f,
                "resource[{}]/scope[{}]/profile[{}]",
                resource, scope, profile
            ),
        }
    }
}

/// Cursor over every node of one level, in batch order.
///
/// The cursor holds positions only, so the batch can be mutated between
/// calls to [`HierarchyWalker::next_node`]. Containers without children are
/// skipped.
#[derive(Debug, Clone)]
pub struct HierarchyWalker {
    level: ContextLevel,
    resource: usize,
    scope: usize,
    profile: usize,
}

impl HierarchyWalker {
    pub fn new(level: ContextLevel) -> Self {
        Self {
            level,
            resource: 0,
            scope: 0,
            profile: 0,
        }
    }

    /// Rewinds to the first node.
    pub fn reset(&mut self) {
        self.resource = 0;
        self.scope = 0;
        self.profile = 0;
    }

    pub fn next_node(&mut self, batch: &Profiles) -> Option<NodeId> {
        match self.level {
            ContextLevel::Resource => {
                if self.resource >= batch.resource_profiles.len() {
                    return None;
                }
                let node = NodeId::Resource {
                    resource: self.resource,
                };
                self.resource += 1;
                Some(node)
            }
            ContextLevel::Scope => loop {
                let resource = batch.resource_profiles.get(self.resource)?;
                if self.scope < resource.scope_profiles.len() {
                    let node = NodeId::Scope {
                        resource: self.resource,
                        scope: self.scope,
                    };
                    self.scope += 1;
                    return Some(node);
                }
                self.resource += 1;
                self.scope = 0;
            },
            ContextLevel::Profile => loop {
                let resource = batch.resource_profiles.get(self.resource)?;
                match resource.scope_profiles.get(self.scope) {
                    Some(scope) if self.profile < scope.profiles.len() => {
                        let node = NodeId::Profile {
                            resource: self.resource,
                            scope: self.scope,
                            profile: self.profile,
                        };
                        self.profile += 1;
                        return Some(node);
                    }
                    Some(_) => {
                        self.scope += 1;
                        self.profile = 0;
                    }
                    None => {
                        self.resource += 1;
                        self.scope = 0;
                        self.profile = 0;
                    }
                }
            },
        }
    }

    /// Iterates the nodes of `level` in a batch that is not modified meanwhile.
    pub fn iter(level: ContextLevel, batch: &Profiles) -> impl Iterator<Item = NodeId> + '_ {
        let mut walker = HierarchyWalker::new(level);
        std::iter::from_fn(move || walker.next_node(batch))
    }
}
