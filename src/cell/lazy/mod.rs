//! Once-only initialization primitives.

pub mod singleton;
pub mod strategy;

pub use singleton::{LazySingleton, SingletonState};
pub use strategy::{ParseStrategyError, Strategy};
