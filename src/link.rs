//! Link resolver: breadth-first closure over a module's imports.
//!
//! Local specifiers resolve against the supplied script set through
//! [`ScriptFile::matches_specifier`]; `http(s)://` specifiers go through a
//! [`RemoteModuleLoader`], the analyzer's only suspension point. Remote
//! modules are degraded to a bag of exported function sources rather than a
//! structured module, trading precision for never crashing the analysis.

use crate::error::RamAnalysisError;
use crate::graph::ParsedModule;
use crate::parse::parse_script;
use parse_js::ast::stmt::Stmt;
use std::collections::VecDeque;
use std::error::Error;
use tracing::debug;

/// An auxiliary script that imports may resolve to.
pub trait ScriptFile {
  fn filename(&self) -> &str;
  fn code(&self) -> &str;

  /// Whether an import specifier names this script. The default collapses
  /// the known script extensions, so `lib`, `lib.js` and `lib.script` are
  /// interchangeable; hosts override this to tune the equivalence.
  fn matches_specifier(&self, specifier: &str) -> bool {
    imports_equal(self.filename(), specifier)
  }
}

/// Owned filename/code pair; the minimal [`ScriptFile`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Script {
  pub filename: String,
  pub code: String,
}

impl Script {
  pub fn new(filename: impl Into<String>, code: impl Into<String>) -> Self {
    Script {
      filename: filename.into(),
      code: code.into(),
    }
  }
}

impl ScriptFile for Script {
  fn filename(&self) -> &str {
    &self.filename
  }

  fn code(&self) -> &str {
    &self.code
  }
}

/// The default specifier/filename equivalence, extension-insensitive over
/// the script extensions.
pub fn imports_equal(filename: &str, specifier: &str) -> bool {
  trim_script_extension(filename) == trim_script_extension(specifier)
}

fn trim_script_extension(path: &str) -> &str {
  path
    .strip_suffix(".js")
    .or_else(|| path.strip_suffix(".script"))
    .unwrap_or(path)
}

/// Supplies source text for `http(s)://` imports.
///
/// Implementations own transport and blocking policy; any failure surfaces
/// as [`RamAnalysisError::UrlImport`].
pub trait RemoteModuleLoader {
  fn fetch(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Loader that refuses every remote import.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoteImportsDisabled;

impl RemoteModuleLoader for RemoteImportsDisabled {
  fn fetch(&self, _url: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    Err("remote module loading is disabled".into())
  }
}

/// Parses the entry-point module and, breadth first, every module reachable
/// through imports.
///
/// The entry module comes first in the returned list and is labeled with
/// the empty path; every other module is labeled with its normalized
/// specifier, and each is parsed at most once, which also breaks import
/// cycles.
pub fn parse_all<S: ScriptFile>(
  code: &str,
  other_scripts: &[S],
  loader: &dyn RemoteModuleLoader,
) -> Result<Vec<ParsedModule>, RamAnalysisError> {
  let entry = parse_script(code, "")?;
  let mut worklist: VecDeque<String> = VecDeque::new();
  for import in entry.imported_modules.iter() {
    if !worklist.contains(&import.file_path) {
      worklist.push_back(import.file_path.clone());
    }
  }
  let mut modules = vec![entry];
  while let Some(specifier) = worklist.pop_front() {
    let path = normalize_specifier(&specifier);
    if modules.iter().any(|module| module.file_path == path) {
      continue;
    }
    debug!(specifier = %specifier, "resolving import");
    let source = if specifier.starts_with("http://") || specifier.starts_with("https://") {
      synthesize_remote_module(&specifier, loader)?
    } else {
      other_scripts
        .iter()
        .find(|script| script.matches_specifier(path))
        .map(|script| script.code().to_string())
        .ok_or_else(|| RamAnalysisError::Import {
          path: path.to_string(),
        })?
    };
    let module = parse_script(&source, path)?;
    for import in module.imported_modules.iter() {
      worklist.push_back(import.file_path.clone());
    }
    modules.push(module);
  }
  Ok(modules)
}

/// Import specifiers and module labels differ only by an optional leading
/// `./`.
pub(crate) fn normalize_specifier(specifier: &str) -> &str {
  specifier.strip_prefix("./").unwrap_or(specifier)
}

// The remote module becomes the concatenated source text of its exported
// named function and class declarations, parsed as an ordinary module body.
fn synthesize_remote_module(
  url: &str,
  loader: &dyn RemoteModuleLoader,
) -> Result<String, RamAnalysisError> {
  let remote = loader
    .fetch(url)
    .map_err(|reason| RamAnalysisError::UrlImport {
      url: url.to_string(),
      reason: reason.to_string(),
    })?;
  let top_level = parse_js::parse(&remote).map_err(|err| RamAnalysisError::UrlImport {
    url: url.to_string(),
    reason: format!("remote module failed to parse: {err}"),
  })?;
  let mut synthesized = String::new();
  for stmt in top_level.stx.body.iter() {
    let (exported, loc) = match stmt.stx.as_ref() {
      Stmt::FunctionDecl(decl) => (decl.stx.export && decl.stx.name.is_some(), decl.loc),
      Stmt::ClassDecl(decl) => (decl.stx.export && decl.stx.name.is_some(), decl.loc),
      _ => (false, stmt.loc),
    };
    if !exported {
      continue;
    }
    let Some(text) = remote.get(loc.0..loc.1) else {
      return Err(RamAnalysisError::UrlImport {
        url: url.to_string(),
        reason: "remote module has an unsupported shape".to_string(),
      });
    };
    synthesized.push_str(text);
    synthesized.push_str(";\n");
  }
  Ok(synthesized)
}
