//! Interface synthesis for template-check.
//!
//! A template's bindings imply the minimal shape its view-model must have.
//! The generator turns a template path into the source text of an interface
//! describing that shape, under a caller-chosen type name.

mod generator;

pub use generator::{synthetic_name, InterfaceSynthesizer, NodeInterfaceGenerator, SynthesisError};
