//! Step index: catalog, canonical keys and localized labels.

mod catalog;
pub mod words;

pub use catalog::{StepCatalog, StepDefinition};
