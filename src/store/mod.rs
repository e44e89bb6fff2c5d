//! Template persistence.
//!
//! The [`TemplateStore`] trait is the boundary to whatever backend keeps
//! templates. [`InMemoryTemplateStore`] is the bundled implementation, seeded
//! from the configuration file by the CLI.

mod filter;
mod memory;
mod traits;

pub use filter::TemplateFilter;
pub use memory::InMemoryTemplateStore;
pub use traits::TemplateStore;
