//! Event-sourced aggregate contract.

/// Identity and stream position of an aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied so far. A never-created aggregate is at 0.
    fn version(&self) -> u64;
}

/// What an append expects the stream revision to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == actual,
        }
    }
}

/// `handle` decides, `apply` evolves.
///
/// `handle` must not mutate and returns an empty vec when the command is a
/// no-op; `apply` bumps the version by one per event. Neither does IO.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn apply(&mut self, event: &Self::Event);
}
