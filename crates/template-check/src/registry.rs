//! Source registry: the compilation unit handed to the checker.
//!
//! The registry is the single place that decides which virtual path every
//! source lives under, and it keeps the reverse table (path → origin,
//! request → paths) the locator uses to map diagnostics back.

use crate::request::CheckRequest;
use closure_runner::VirtualSourceFile;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::debug;

/// Virtual path of the framework externs.
pub const EXTERNS_PATH: &str = "polymer-1.0.js";
/// Virtual path of the harness module.
pub const HARNESS_PATH: &str = "interface-test.js";
/// Module id the harness declares.
pub const HARNESS_MODULE: &str = "template.check";

/// Virtual path of the generated interface for request slot `index`.
pub fn generated_interface_path(index: usize) -> String {
    format!("generated-html-interface{index}.js")
}

/// Run-independent name reports use for the generated module of slot `index`.
pub fn stable_module_name(index: usize) -> String {
    format!("generated-html-interface{index}")
}

/// Virtual path of the view-model for request slot `index`.
pub fn view_source_path(index: usize) -> String {
    format!("view-source{index}.js")
}

/// Virtual path for the `position`-th unnamed additional source of `index`.
pub fn default_additional_path(index: usize, position: usize) -> String {
    format!("additional-source{index}-{position}.js")
}

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Where a registered source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Framework externs.
    Externs,
    /// Caller-supplied declarations, shared by every listed request slot.
    Additional { requests: Vec<usize> },
    /// Transpiled generated interface of a request slot.
    GeneratedInterface(usize),
    /// The real view-model of a request slot.
    ViewModel(usize),
    /// The synthesized harness.
    Harness,
}

#[derive(Debug, Clone)]
struct RegisteredSource {
    source: String,
    origin: SourceOrigin,
}

/// Registry assembly errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two different sources claim the same virtual path.
    #[error("virtual path `{path}` is used by more than one source")]
    PathCollision { path: String },
}

/// Everything the registry needs to know about one request of the unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitMember<'a> {
    pub request: &'a CheckRequest,
    pub view_source: &'a str,
    pub compiled_interface: &'a str,
    pub module_id: &'a str,
    pub synthetic_name: &'a str,
}

/// Ordered virtual sources of one compilation unit.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    files: FxIndexMap<String, RegisteredSource>,
    request_paths: Vec<Vec<String>>,
    harness_blocks: Vec<RangeInclusive<u32>>,
}

impl SourceRegistry {
    /// Assembles externs, additional sources, generated interfaces,
    /// view-models and the harness, in that order.
    pub fn assemble(externs: &str, members: &[UnitMember<'_>]) -> Result<Self, RegistryError> {
        let mut registry = Self {
            files: FxIndexMap::default(),
            request_paths: vec![Vec::new(); members.len()],
            harness_blocks: Vec::new(),
        };

        registry.insert(EXTERNS_PATH.to_string(), externs, SourceOrigin::Externs)?;

        let reserved = reserved_paths(members.len());
        for (index, member) in members.iter().enumerate() {
            for (position, additional) in member.request.additional_sources.iter().enumerate() {
                let path = additional
                    .virtual_path
                    .clone()
                    .unwrap_or_else(|| default_additional_path(index, position));
                if reserved.contains(&path) {
                    return Err(RegistryError::PathCollision { path });
                }
                registry.insert_additional(path, &additional.source, index)?;
            }
        }

        for (index, member) in members.iter().enumerate() {
            registry.insert(
                generated_interface_path(index),
                member.compiled_interface,
                SourceOrigin::GeneratedInterface(index),
            )?;
            registry.insert(
                view_source_path(index),
                member.view_source,
                SourceOrigin::ViewModel(index),
            )?;
        }

        let (harness, blocks) = build_harness(members);
        registry.insert(HARNESS_PATH.to_string(), &harness, SourceOrigin::Harness)?;
        registry.harness_blocks = blocks;

        debug!(files = registry.files.len(), requests = members.len(), "assembled source registry");
        Ok(registry)
    }

    fn insert(
        &mut self,
        path: String,
        source: &str,
        origin: SourceOrigin,
    ) -> Result<(), RegistryError> {
        if self.files.contains_key(&path) {
            return Err(RegistryError::PathCollision { path });
        }
        self.track(&origin, &path);
        self.files.insert(
            path,
            RegisteredSource {
                source: source.to_string(),
                origin,
            },
        );
        Ok(())
    }

    fn insert_additional(
        &mut self,
        path: String,
        source: &str,
        index: usize,
    ) -> Result<(), RegistryError> {
        match self.files.get_mut(&path) {
            Some(RegisteredSource {
                source: existing,
                origin: SourceOrigin::Additional { requests },
            }) if existing == source => {
                if !requests.contains(&index) {
                    requests.push(index);
                    self.request_paths[index].push(path);
                }
                Ok(())
            }
            Some(_) => Err(RegistryError::PathCollision { path }),
            None => self.insert(
                path,
                source,
                SourceOrigin::Additional {
                    requests: vec![index],
                },
            ),
        }
    }

    fn track(&mut self, origin: &SourceOrigin, path: &str) {
        let owner = match origin {
            SourceOrigin::Additional { requests } => requests.first().copied(),
            SourceOrigin::GeneratedInterface(index) | SourceOrigin::ViewModel(index) => {
                Some(*index)
            }
            SourceOrigin::Externs | SourceOrigin::Harness => None,
        };
        if let Some(index) = owner {
            self.request_paths[index].push(path.to_string());
        }
    }

    /// The unit in checker order.
    pub fn to_virtual_files(&self) -> Vec<VirtualSourceFile> {
        self.files
            .iter()
            .map(|(path, file)| VirtualSourceFile::new(path.clone(), file.source.clone()))
            .collect()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the registry is empty (never true after assembly).
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of request slots.
    pub fn request_count(&self) -> usize {
        self.request_paths.len()
    }

    /// Origin of a virtual path.
    pub fn origin(&self, path: &str) -> Option<&SourceOrigin> {
        self.files.get(path).map(|file| &file.origin)
    }

    /// Source text registered under a virtual path.
    pub fn source(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(|file| file.source.as_str())
    }

    /// Virtual paths owned by a request slot.
    pub fn paths_for(&self, index: usize) -> &[String] {
        self.request_paths
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Request slot whose harness block contains the 1-based `line`.
    pub fn harness_owner(&self, line: u32) -> Option<usize> {
        self.harness_blocks
            .iter()
            .position(|block| block.contains(&line))
    }
}

fn reserved_paths(count: usize) -> Vec<String> {
    let mut reserved = vec![EXTERNS_PATH.to_string(), HARNESS_PATH.to_string()];
    for index in 0..count {
        reserved.push(generated_interface_path(index));
        reserved.push(view_source_path(index));
    }
    reserved
}

/// Builds the harness module and the line range each request occupies.
fn build_harness(members: &[UnitMember<'_>]) -> (String, Vec<RangeInclusive<u32>>) {
    let mut lines = vec![format!("goog.module('{HARNESS_MODULE}');")];
    let mut blocks = Vec::with_capacity(members.len());

    for (i, member) in members.iter().enumerate() {
        lines.push(String::new());
        let start = lines.len() as u32 + 1;
        lines.push(format!(
            "const templateInterface{i} = goog.require('{}'); // {}",
            member.module_id, member.request.template
        ));
        lines.push(format!(
            "const View{i} = goog.require('{}');",
            member.request.view_model_module
        ));
        lines.push(String::new());
        lines.push(format!("/** @type {{!View{i}}} */"));
        lines.push(format!("const view{i} = new View{i}();"));
        lines.push(String::new());
        lines.push(format!(
            "var /** !templateInterface{i}.{} */ t{i} = view{i};",
            member.synthetic_name
        ));
        blocks.push(start..=lines.len() as u32);
    }

    let mut harness = lines.join("\n");
    harness.push('\n');
    (harness, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AdditionalSource;
    use pretty_assertions::assert_eq;

    fn member<'a>(request: &'a CheckRequest, module_id: &'a str, name: &'a str) -> UnitMember<'a> {
        UnitMember {
            request,
            view_source: "goog.module('foo.foo_elm');",
            compiled_interface: "goog.module('gen');",
            module_id,
            synthetic_name: name,
        }
    }

    fn paths(registry: &SourceRegistry) -> Vec<String> {
        registry
            .to_virtual_files()
            .into_iter()
            .map(|file| file.path)
            .collect()
    }

    #[test]
    fn test_composition_order() {
        let first = CheckRequest::new("a.html", "a.js", "foo.a")
            .with_additional_source(AdditionalSource::named("custom-externs.js", "var page;"))
            .with_additional_source(AdditionalSource::anonymous("var Gerrit;"));
        let second = CheckRequest::new("b.html", "b.js", "foo.b");
        let members = [
            member(&first, "gen.a", "html_interface_0"),
            member(&second, "gen.b", "html_interface_1"),
        ];

        let registry = SourceRegistry::assemble("/** @externs */", &members).unwrap();
        assert_eq!(
            paths(&registry),
            vec![
                "polymer-1.0.js",
                "custom-externs.js",
                "additional-source0-1.js",
                "generated-html-interface0.js",
                "view-source0.js",
                "generated-html-interface1.js",
                "view-source1.js",
                "interface-test.js",
            ]
        );
        assert_eq!(
            registry.paths_for(0),
            &[
                "custom-externs.js".to_string(),
                "additional-source0-1.js".to_string(),
                "generated-html-interface0.js".to_string(),
                "view-source0.js".to_string(),
            ]
        );
        assert_eq!(registry.origin("view-source1.js"), Some(&SourceOrigin::ViewModel(1)));
        assert_eq!(registry.origin("polymer-1.0.js"), Some(&SourceOrigin::Externs));
        assert_eq!(registry.request_count(), 2);
    }

    #[test]
    fn test_harness_text_and_blocks() {
        let request = CheckRequest::new("test/elms/foo-elm.html", "foo-elm.js", "foo.foo_elm");
        let members = [member(&request, "_tmp.tmp_1.html", "html_interface_0")];
        let registry = SourceRegistry::assemble("", &members).unwrap();

        let expected = "\
goog.module('template.check');

const templateInterface0 = goog.require('_tmp.tmp_1.html'); // test/elms/foo-elm.html
const View0 = goog.require('foo.foo_elm');

/** @type {!View0} */
const view0 = new View0();

var /** !templateInterface0.html_interface_0 */ t0 = view0;
";
        assert_eq!(registry.source(HARNESS_PATH), Some(expected));
        assert_eq!(registry.harness_owner(1), None);
        assert_eq!(registry.harness_owner(2), None);
        assert_eq!(registry.harness_owner(3), Some(0));
        assert_eq!(registry.harness_owner(9), Some(0));
        assert_eq!(registry.harness_owner(10), None);
    }

    #[test]
    fn test_second_harness_block() {
        let a = CheckRequest::new("a.html", "a.js", "foo.a");
        let b = CheckRequest::new("b.html", "b.js", "foo.b");
        let members = [
            member(&a, "gen.a", "html_interface_0"),
            member(&b, "gen.b", "html_interface_1"),
        ];
        let registry = SourceRegistry::assemble("", &members).unwrap();
        let harness = registry.source(HARNESS_PATH).unwrap();
        let line_of = |needle: &str| {
            harness
                .lines()
                .position(|line| line.contains(needle))
                .unwrap() as u32
                + 1
        };
        assert_eq!(registry.harness_owner(line_of("t0 = view0")), Some(0));
        assert_eq!(registry.harness_owner(line_of("goog.require('gen.b')")), Some(1));
        assert_eq!(registry.harness_owner(line_of("t1 = view1")), Some(1));
    }

    #[test]
    fn test_identical_shared_additional_source_is_merged() {
        let shared = AdditionalSource::named("custom-externs.js", "var page;");
        let a = CheckRequest::new("a.html", "a.js", "foo.a").with_additional_source(shared.clone());
        let b = CheckRequest::new("b.html", "b.js", "foo.b").with_additional_source(shared);
        let members = [
            member(&a, "gen.a", "html_interface_0"),
            member(&b, "gen.b", "html_interface_1"),
        ];

        let registry = SourceRegistry::assemble("", &members).unwrap();
        assert_eq!(
            registry.origin("custom-externs.js"),
            Some(&SourceOrigin::Additional {
                requests: vec![0, 1]
            })
        );
        assert!(registry.paths_for(1).contains(&"custom-externs.js".to_string()));
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_conflicting_additional_sources_collide() {
        let a = CheckRequest::new("a.html", "a.js", "foo.a")
            .with_additional_source(AdditionalSource::named("externs.js", "var page;"));
        let b = CheckRequest::new("b.html", "b.js", "foo.b")
            .with_additional_source(AdditionalSource::named("externs.js", "var Gerrit;"));
        let members = [
            member(&a, "gen.a", "html_interface_0"),
            member(&b, "gen.b", "html_interface_1"),
        ];

        let err = SourceRegistry::assemble("", &members).unwrap_err();
        assert!(matches!(err, RegistryError::PathCollision { path } if path == "externs.js"));
    }

    #[test]
    fn test_reserved_path_collides() {
        let request = CheckRequest::new("a.html", "a.js", "foo.a")
            .with_additional_source(AdditionalSource::named("view-source0.js", "var x;"));
        let members = [member(&request, "gen.a", "html_interface_0")];

        let err = SourceRegistry::assemble("", &members).unwrap_err();
        assert!(matches!(err, RegistryError::PathCollision { path } if path == "view-source0.js"));
    }
}
