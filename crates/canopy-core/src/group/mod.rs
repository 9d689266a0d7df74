//! Category groups
//!
//! A group owns one tree (structure), one field layout and the URL settings of
//! each enabled locale. [`GroupStore`] reads and writes groups through the
//! storage collaborators and keeps an explicit [`GroupCache`].

pub mod cache;
mod locale;
mod model;
mod store;

#[cfg(test)]
mod tests;

pub use cache::GroupCache;
pub use locale::GroupLocale;
pub use model::CategoryGroup;
pub use store::GroupStore;
