//! Transpilation of generated interfaces into checker-native modules.
//!
//! The generated interface is TypeScript; the checker only understands
//! annotated JavaScript modules. This crate writes the interface to a scoped
//! temporary file, runs the transpiler over it, and recovers the id of the
//! module the transpiler declared.
//!
//! # Example
//!
//! ```ignore
//! use transpile_runner::{compile_interface, NodeTranspiler};
//!
//! let artifact = compile_interface(&transpiler, &interface_source, "html_interface_0").await?;
//! println!("{}", artifact.module_id());
//! artifact.release()?;
//! ```

mod artifact;
mod module_id;
mod transpiler;

pub use artifact::InterfaceArtifact;
pub use module_id::{parse_module_id, ModuleIdError};
pub use transpiler::{
    compile_interface, NodeTranspiler, TranspileError, TranspileOutput, Transpiler,
    INTERFACE_SUFFIX,
};
