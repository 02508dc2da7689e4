//! Build-time checks that view-models satisfy the interfaces their
//! templates' bindings imply.
//!
//! Each [`CheckRequest`] pairs a template with the view-model backing it.
//! The template is turned into a generated interface, the interface is
//! transpiled into a checker module, and a harness module asserts that the
//! view-model instance has the interface type. The checker then runs once
//! per compilation unit and its diagnostics are mapped back to the request
//! and original source they came from.
//!
//! # Example
//!
//! ```ignore
//! use template_check::{CheckOptions, CheckRequest, TemplateChecker};
//!
//! let checker = TemplateChecker::new(toolchain, CheckOptions::new(externs, workspace));
//! let report = checker
//!     .run(&[CheckRequest::new("foo-elm.html", "foo-elm.js", "foo.foo_elm")])
//!     .await;
//! for result in &report.results {
//!     print!("{}", result.formatted_report);
//! }
//! ```

pub mod config;
pub mod locator;
pub mod orchestrator;
pub mod output;
pub mod registry;
pub mod request;

pub use config::{ConfigError, ProjectConfig};
pub use locator::{LocatedDiagnostic, Locator};
pub use orchestrator::{
    AggregateCheckError, BatchReport, CheckError, CheckMode, CheckOptions, CheckResult,
    TemplateChecker, Toolchain,
};
pub use output::{CheckSummary, OutputFormat};
pub use registry::{RegistryError, SourceOrigin, SourceRegistry, UnitMember};
pub use request::{AdditionalSource, CheckRequest};
