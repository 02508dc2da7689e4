//! The transpiled interface and the temporary file backing it.

use camino::Utf8Path;
use std::fmt;
use tempfile::TempPath;
use tracing::debug;

/// A generated interface, transpiled and ready to hand to the checker.
///
/// Owns the temporary file the interface was written to. [`release`] deletes
/// it and reports the outcome; dropping the artifact without releasing it
/// still deletes the file, so every exit path cleans up exactly once.
///
/// [`release`]: InterfaceArtifact::release
pub struct InterfaceArtifact {
    pub(crate) interface_source: String,
    pub(crate) synthetic_name: String,
    pub(crate) compiled: String,
    pub(crate) module_id: String,
    pub(crate) temp_path: TempPath,
}

impl InterfaceArtifact {
    /// The interface source as produced by the generator.
    pub fn interface_source(&self) -> &str {
        &self.interface_source
    }

    /// Name of the interface type inside the module.
    pub fn synthetic_name(&self) -> &str {
        &self.synthetic_name
    }

    /// Transpiled, checker-native module text.
    pub fn compiled(&self) -> &str {
        &self.compiled
    }

    /// Module id declared by the transpiled text.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Location of the temporary interface file.
    pub fn temp_path(&self) -> &Utf8Path {
        // Temp paths are built from a UTF-8 directory in `compile_interface`.
        Utf8Path::from_path(&self.temp_path).unwrap_or_else(|| Utf8Path::new(""))
    }

    /// Deletes the temporary file.
    pub fn release(self) -> std::io::Result<()> {
        debug!(module = %self.module_id, "releasing interface artifact");
        self.temp_path.close()
    }
}

impl fmt::Debug for InterfaceArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceArtifact")
            .field("synthetic_name", &self.synthetic_name)
            .field("module_id", &self.module_id)
            .field("temp_path", &self.temp_path.display())
            .finish_non_exhaustive()
    }
}
