//! LSP server for step scripts.
//!
//! Provides semantic highlighting, step completion, hover documentation
//! and debounced unknown-step diagnostics. Hosts reconfigure the tables
//! through `workspace/executeCommand`.

mod hover;
mod semantic;
mod server;

pub use server::serve_stdio;
