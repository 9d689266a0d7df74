//! Categories: the model, its URIs and its save/delete lifecycle

pub mod cascade;
mod lifecycle;
mod model;
pub mod uri;

#[cfg(test)]
mod tests;

pub use cascade::CascadeDeleter;
pub use lifecycle::{CancelPolicy, CategoryLifecycle, LifecycleOptions};
pub use model::{Category, NewParent};
