//! Framework externs lookup.

use camino::{Utf8Path, Utf8PathBuf};

/// Location of the framework externs inside an installed checker package.
pub const POLYMER_EXTERNS_PATH: &str =
    "node_modules/google-closure-compiler-js/contrib/externs/polymer-1.0.js";

/// Finds the framework externs by searching `node_modules` up the directory
/// tree, so hoisted monorepo installs resolve too.
pub fn find_polymer_externs(workspace_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = Some(workspace_root);

    while let Some(dir) = current {
        let candidate = dir.join(POLYMER_EXTERNS_PATH);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }

    None
}
