//! Lifecycle hooks for categories

pub mod hooks;

pub use hooks::{BeforeSaveHook, CategoryEvent, CategoryHooks, CategoryObserver, HookResult};
