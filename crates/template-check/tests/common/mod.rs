//! In-process stand-ins for the generator, transpiler and checker.
//!
//! The fakes speak a tiny dialect that keeps the contract of the real tools:
//! - the generator turns every `{{name}}` binding into an interface member;
//! - the transpiler reads the temporary file it is given and emits a
//!   `goog.module` declaring one `@record` with a prototype slot per member;
//!   like tsickle, it names the module after the temporary file;
//! - the checker reports a missing property on the view-model for every
//!   record slot whose name does not appear as `name:` in the view-model.

#![allow(dead_code)]

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use closure_runner::{
    Checker, CheckerError, CheckerFlags, CheckerOutput, Diagnostic, DiagnosticSeverity,
    VirtualSourceFile,
};
use interface_gen::{InterfaceSynthesizer, SynthesisError};
use std::fs;
use std::sync::{Arc, Mutex};
use template_check::{CheckMode, CheckOptions, TemplateChecker, Toolchain};
use transpile_runner::{TranspileError, TranspileOutput, Transpiler};

pub const EXTERNS: &str = "/** @externs */\nvar Polymer = function(descriptor) {};\n";

/// A workspace directory holding templates and view-models.
pub struct Workspace {
    _dir: tempfile::TempDir,
    pub root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        Self { _dir: dir, root }
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// A view-model declaring `properties` as `name: String` entries.
pub fn view_model(module: &str, properties: &[&str]) -> String {
    let mut source = format!("goog.module('{module}');\n\nexports = Polymer({{\n  is: 'x-elm',\n  properties: {{\n");
    for property in properties {
        source.push_str(&format!("    {property}: String,\n"));
    }
    source.push_str("  },\n});\n");
    source
}

#[derive(Default)]
pub struct FakeSynthesizer {
    workspace: Utf8PathBuf,
}

#[async_trait]
impl InterfaceSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        template: &Utf8Path,
        synthetic_name: &str,
    ) -> Result<String, SynthesisError> {
        let path = self.workspace.join(template);
        let markup = fs::read_to_string(&path)
            .map_err(|_| SynthesisError::TemplateNotFound(path.clone()))?;
        if markup.contains("<broken") {
            return Err(SynthesisError::TemplateParse {
                template: template.to_path_buf(),
                message: "unclosed tag".to_string(),
            });
        }

        let mut interface = format!("export interface {synthetic_name} {{\n");
        for binding in bindings(&markup) {
            interface.push_str(&format!("  {binding}: string;\n"));
        }
        interface.push_str("}\n");
        Ok(interface)
    }
}

fn bindings(markup: &str) -> Vec<&str> {
    markup
        .split("{{")
        .skip(1)
        .filter_map(|rest| rest.split_once("}}"))
        .map(|(binding, _)| binding.trim())
        .collect()
}

/// Records every temporary file it was asked to transpile.
#[derive(Default)]
pub struct FakeTranspiler {
    pub seen: Mutex<Vec<Utf8PathBuf>>,
}

impl FakeTranspiler {
    pub fn seen_paths(&self) -> Vec<Utf8PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transpiler for FakeTranspiler {
    async fn transpile(&self, path: &Utf8Path) -> Result<TranspileOutput, TranspileError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        assert!(path.as_str().ends_with(".ts"), "{path}");
        let interface = fs::read_to_string(path)?;

        let name = interface
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("export interface "))
            .and_then(|rest| rest.strip_suffix(" {"))
            .unwrap_or_default()
            .to_string();
        let members: Vec<&str> = interface
            .lines()
            .filter_map(|line| line.trim().strip_suffix(": string;"))
            .collect();

        if members.contains(&"fail_transpile") {
            return Ok(TranspileOutput::Failed {
                diagnostics: vec![format!("{path}: unsupported member fail_transpile")],
            });
        }

        let stem = path.file_stem().unwrap_or_default().replace('-', "_");
        let mut compiled = format!(
            "goog.module('_tmp.{stem}.{name}');\n/** @record */\nfunction {name}() {{}}\n"
        );
        for member in members {
            compiled.push_str(&format!("/** @type {{string}} */\n{name}.prototype.{member};\n"));
        }
        compiled.push_str(&format!("exports.{name} = {name};\n"));

        Ok(TranspileOutput::Emitted {
            files: vec![(path.with_extension("js"), compiled)],
        })
    }
}

/// Records every compilation unit it was handed.
#[derive(Default)]
pub struct FakeChecker {
    pub units: Mutex<Vec<Vec<VirtualSourceFile>>>,
    pub crash: bool,
    /// Name the mangled interface type in every message.
    pub name_interface: bool,
}

impl FakeChecker {
    pub fn naming_interface() -> Self {
        Self {
            name_interface: true,
            ..Default::default()
        }
    }

    pub fn crashing() -> Self {
        Self {
            crash: true,
            ..Default::default()
        }
    }

    pub fn units(&self) -> Vec<Vec<VirtualSourceFile>> {
        self.units.lock().unwrap().clone()
    }
}

#[async_trait]
impl Checker for FakeChecker {
    async fn compile(
        &self,
        sources: &[VirtualSourceFile],
        flags: &CheckerFlags,
    ) -> Result<CheckerOutput, CheckerError> {
        assert_eq!(flags, &CheckerFlags::default());
        self.units.lock().unwrap().push(sources.to_vec());
        if self.crash {
            return Err(CheckerError::InvalidInput("internal compiler error".to_string()));
        }

        let mut output = CheckerOutput::default();
        let mut slot = 0;
        while let Some(interface) = source(sources, &format!("generated-html-interface{slot}.js")) {
            let view_path = format!("view-source{slot}.js");
            let view = source(sources, &view_path).unwrap_or_default();
            let mangled = interface
                .lines()
                .next()
                .and_then(|line| line.strip_prefix("goog.module('"))
                .and_then(|rest| rest.strip_suffix("');"))
                .unwrap_or_default()
                .replace('.', "$");
            let (line, column) = view
                .lines()
                .enumerate()
                .find_map(|(i, text)| text.find("Polymer(").map(|col| (i + 1, col + 1)))
                .unwrap_or((1, 1));

            for member in interface
                .lines()
                .filter_map(|line| line.split_once(".prototype."))
                .map(|(_, member)| member.trim_end_matches(';'))
            {
                if !view.contains(&format!("{member}:")) {
                    let mut message = format!("Property {member} never defined on View{slot}");
                    if self.name_interface {
                        message.push_str(&format!(
                            "\nrequired: module$contents${mangled}_html_interface_{slot}"
                        ));
                    }
                    output.warnings.push(Diagnostic {
                        virtual_path: view_path.clone(),
                        message,
                        kind: "JSC_POSSIBLE_INEXISTENT_PROPERTY".to_string(),
                        severity: DiagnosticSeverity::Warning,
                        line: line as u32,
                        column: column as u32,
                    });
                }
            }
            slot += 1;
        }
        Ok(output)
    }
}

fn source<'a>(sources: &'a [VirtualSourceFile], path: &str) -> Option<&'a str> {
    sources
        .iter()
        .find(|file| file.path == path)
        .map(|file| file.source.as_str())
}

/// A checker wired to the fakes, with handles kept for inspection.
pub struct Harness {
    pub transpiler: Arc<FakeTranspiler>,
    pub checker: Arc<FakeChecker>,
    pub template_checker: TemplateChecker,
}

impl Harness {
    pub fn new(workspace: &Workspace, mode: CheckMode) -> Self {
        Self::with_checker(workspace, mode, FakeChecker::default())
    }

    pub fn with_checker(workspace: &Workspace, mode: CheckMode, checker: FakeChecker) -> Self {
        let transpiler = Arc::new(FakeTranspiler::default());
        let checker = Arc::new(checker);
        let toolchain = Toolchain {
            synthesizer: Arc::new(FakeSynthesizer {
                workspace: workspace.root.clone(),
            }),
            transpiler: transpiler.clone(),
            checker: checker.clone(),
        };
        let options = CheckOptions::new(EXTERNS, workspace.root.clone()).with_mode(mode);
        Self {
            transpiler,
            checker,
            template_checker: TemplateChecker::new(toolchain, options),
        }
    }
}
