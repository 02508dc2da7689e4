//! Maps checker diagnostics back to requests and original sources.

use crate::registry::{SourceOrigin, SourceRegistry};
use closure_runner::Diagnostic;
use rustc_hash::FxHashMap;
use source_map::{Excerpt, LineIndex};

/// Resolves diagnostics against one assembled compilation unit.
pub struct Locator<'a> {
    registry: &'a SourceRegistry,
    indexes: FxHashMap<&'a str, (&'a str, LineIndex)>,
}

impl<'a> Locator<'a> {
    /// Creates a locator, indexing every user-facing source of `registry`.
    pub fn new(registry: &'a SourceRegistry) -> Self {
        let mut indexes = FxHashMap::default();
        for index in 0..registry.request_count() {
            for path in registry.paths_for(index) {
                if indexes.contains_key(path.as_str()) {
                    continue;
                }
                if let Some(source) = original_source(registry, path) {
                    indexes.insert(path.as_str(), (source, LineIndex::new(source)));
                }
            }
        }
        Self { registry, indexes }
    }

    /// Request slots a diagnostic belongs to.
    ///
    /// Diagnostics that cannot be pinned to one request (externs, harness
    /// preamble, unknown paths) belong to every request of the unit.
    pub fn owners(&self, diagnostic: &Diagnostic) -> Vec<usize> {
        let owned = match self.registry.origin(&diagnostic.virtual_path) {
            Some(SourceOrigin::ViewModel(index) | SourceOrigin::GeneratedInterface(index)) => {
                Some(vec![*index])
            }
            Some(SourceOrigin::Additional { requests }) => Some(requests.clone()),
            Some(SourceOrigin::Harness) => self
                .registry
                .harness_owner(diagnostic.line)
                .map(|index| vec![index]),
            Some(SourceOrigin::Externs) | None => None,
        };
        owned.unwrap_or_else(|| (0..self.registry.request_count()).collect())
    }

    /// Splits `diagnostics` into one list per request slot, keeping the
    /// checker's order within each list.
    pub fn partition(&self, diagnostics: &[Diagnostic]) -> Vec<Vec<Diagnostic>> {
        let mut partitioned = vec![Vec::new(); self.registry.request_count()];
        for diagnostic in diagnostics {
            for index in self.owners(diagnostic) {
                partitioned[index].push(diagnostic.clone());
            }
        }
        partitioned
    }

    /// Excerpt for a diagnostic, when its file has a user-facing source and
    /// the reported line exists.
    pub fn excerpt(&self, diagnostic: &Diagnostic) -> Option<Excerpt> {
        let (source, index) = self.indexes.get(diagnostic.virtual_path.as_str())?;
        Excerpt::new(source, index, diagnostic.line, diagnostic.column)
    }

    /// Attaches the source excerpt, if any, to a diagnostic.
    pub fn locate(&self, diagnostic: &Diagnostic) -> LocatedDiagnostic {
        LocatedDiagnostic {
            excerpt: self.excerpt(diagnostic),
            diagnostic: diagnostic.clone(),
        }
    }

    /// Renders the report text for one diagnostic.
    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        self.locate(diagnostic).render()
    }
}

/// A diagnostic resolved against its original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDiagnostic {
    pub diagnostic: Diagnostic,
    /// Present only for view-model and additional-source diagnostics whose
    /// line exists.
    pub excerpt: Option<Excerpt>,
}

impl LocatedDiagnostic {
    /// Renders the report text.
    ///
    /// Total over any checker output: unknown files, missing lines and
    /// out-of-range positions fall back to the message alone.
    pub fn render(&self) -> String {
        let mut report = String::new();
        if !self.diagnostic.virtual_path.is_empty() {
            report.push_str("Error from file: ");
            report.push_str(&self.diagnostic.virtual_path);
            report.push('\n');
        }
        report.push_str(&self.diagnostic.message);
        report.push('\n');
        if let Some(excerpt) = &self.excerpt {
            report.push_str(&excerpt.render());
        }
        report
    }
}

/// Original text behind a virtual path: the view-model file or the
/// additional source. Generated files, externs and the harness have none.
pub fn original_source<'a>(registry: &'a SourceRegistry, virtual_path: &str) -> Option<&'a str> {
    match registry.origin(virtual_path)? {
        SourceOrigin::ViewModel(_) | SourceOrigin::Additional { .. } => {
            registry.source(virtual_path)
        }
        SourceOrigin::Externs | SourceOrigin::GeneratedInterface(_) | SourceOrigin::Harness => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{UnitMember, HARNESS_PATH};
    use crate::request::{AdditionalSource, CheckRequest};
    use closure_runner::DiagnosticSeverity;
    use pretty_assertions::assert_eq;

    const VIEW: &str = "goog.module('foo.foo_elm');\n\nexports = Polymer({\n    is: 'foo-elm',\n    properties: {\n        wo: String,\n    },\n});\n";

    fn diagnostic(path: &str, line: u32, column: u32) -> Diagnostic {
        Diagnostic {
            virtual_path: path.to_string(),
            message: "Property wow never defined on foo.foo_elm".to_string(),
            kind: "JSC_POSSIBLE_INEXISTENT_PROPERTY".to_string(),
            severity: DiagnosticSeverity::Warning,
            line,
            column,
        }
    }

    fn registry(requests: &[CheckRequest]) -> SourceRegistry {
        let module_ids: Vec<String> = (0..requests.len()).map(|i| format!("gen.m{i}")).collect();
        let names: Vec<String> = (0..requests.len())
            .map(interface_gen::synthetic_name)
            .collect();
        let members: Vec<UnitMember<'_>> = requests
            .iter()
            .enumerate()
            .map(|(i, request)| UnitMember {
                request,
                view_source: VIEW,
                compiled_interface: "goog.module('gen');\n/** @record */\nclass X {}\n",
                module_id: &module_ids[i],
                synthetic_name: &names[i],
            })
            .collect();
        SourceRegistry::assemble("/** @externs */\nvar Polymer;\n", &members).unwrap()
    }

    fn two_requests() -> Vec<CheckRequest> {
        vec![
            CheckRequest::new("a.html", "a.js", "foo.a").with_additional_source(
                AdditionalSource::named("custom-externs.js", "/** @externs */ var page;"),
            ),
            CheckRequest::new("b.html", "b.js", "foo.b"),
        ]
    }

    #[test]
    fn test_view_model_excerpt() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        let report = locator.format(&diagnostic("view-source0.js", 6, 9));
        insta::assert_snapshot!(report, @r"
        Error from file: view-source0.js
        Property wow never defined on foo.foo_elm
        6: wo: String,
        --- ^
        ");
    }

    #[test]
    fn test_additional_source_excerpt() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        let excerpt = locator
            .excerpt(&diagnostic("custom-externs.js", 1, 21))
            .unwrap();
        assert_eq!(excerpt.text, "/** @externs */ var page;");
        assert_eq!(excerpt.caret_offset, 23);
    }

    #[test]
    fn test_generated_and_unknown_files_have_no_excerpt() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        for path in ["generated-html-interface0.js", "polymer-1.0.js", HARNESS_PATH, "elsewhere.js"] {
            let diag = diagnostic(path, 1, 1);
            assert!(locator.excerpt(&diag).is_none(), "{path}");
            assert_eq!(
                locator.format(&diag),
                format!("Error from file: {path}\n{}\n", diag.message)
            );
        }
    }

    #[test]
    fn test_fileless_diagnostic_has_message_only() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        let report = locator.format(&diagnostic("", 0, 0));
        assert_eq!(report, "Property wow never defined on foo.foo_elm\n");
    }

    #[test]
    fn test_line_past_end_has_no_excerpt() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        assert!(locator.excerpt(&diagnostic("view-source1.js", 400, 1)).is_none());
        assert!(locator.excerpt(&diagnostic("view-source1.js", 0, 1)).is_none());
    }

    #[test]
    fn test_owners() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        assert_eq!(locator.owners(&diagnostic("view-source1.js", 1, 1)), vec![1]);
        assert_eq!(
            locator.owners(&diagnostic("generated-html-interface0.js", 1, 1)),
            vec![0]
        );
        assert_eq!(locator.owners(&diagnostic("custom-externs.js", 1, 1)), vec![0]);
        assert_eq!(locator.owners(&diagnostic("polymer-1.0.js", 1, 1)), vec![0, 1]);
        assert_eq!(locator.owners(&diagnostic("", 0, 0)), vec![0, 1]);
        // Line 1 is the harness preamble.
        assert_eq!(locator.owners(&diagnostic(HARNESS_PATH, 1, 1)), vec![0, 1]);
        assert_eq!(locator.owners(&diagnostic(HARNESS_PATH, 9, 1)), vec![0]);
        assert_eq!(locator.owners(&diagnostic(HARNESS_PATH, 17, 1)), vec![1]);
    }

    #[test]
    fn test_partition_keeps_checker_order() {
        let requests = two_requests();
        let registry = registry(&requests);
        let locator = Locator::new(&registry);

        let diagnostics = vec![
            diagnostic("view-source1.js", 3, 1),
            diagnostic("polymer-1.0.js", 2, 1),
            diagnostic("view-source1.js", 1, 1),
            diagnostic("view-source0.js", 6, 9),
        ];
        let partitioned = locator.partition(&diagnostics);
        let lines = |list: &[Diagnostic]| -> Vec<(String, u32)> {
            list.iter()
                .map(|d| (d.virtual_path.clone(), d.line))
                .collect()
        };
        assert_eq!(
            lines(&partitioned[0]),
            vec![
                ("polymer-1.0.js".to_string(), 2),
                ("view-source0.js".to_string(), 6),
            ]
        );
        assert_eq!(
            lines(&partitioned[1]),
            vec![
                ("view-source1.js".to_string(), 3),
                ("polymer-1.0.js".to_string(), 2),
                ("view-source1.js".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_original_source_lookup() {
        let requests = two_requests();
        let registry = registry(&requests);
        assert_eq!(original_source(&registry, "view-source0.js"), Some(VIEW));
        assert_eq!(
            original_source(&registry, "custom-externs.js"),
            Some("/** @externs */ var page;")
        );
        assert_eq!(original_source(&registry, "generated-html-interface0.js"), None);
        assert_eq!(original_source(&registry, "nope.js"), None);
    }
}
