//! Queue internals shared by task store implementations.

mod dependency;

pub use dependency::DependencyGraph;
