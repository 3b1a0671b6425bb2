//! Data model shared by the module parser, the link resolver and the cost
//! reducer.
//!
//! Everything here is a plain value: modules are immutable once built,
//! references are copied freely, and structural equality over
//! [`DefinedFunction`] is the only comparison the call graph is ever
//! queried with.

/// A fully qualified reference to either a declaration or a call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DefinedFunction {
  pub name: String,
  /// Dotted identifier prefix preceding the name at the reference site;
  /// empty for bare identifiers.
  pub namespace: String,
  /// The module the reference was observed in — never where the callee is
  /// defined. Resolution is deferred to reachability.
  pub file_path: String,
}

impl DefinedFunction {
  pub fn new(
    name: impl Into<String>,
    namespace: impl Into<String>,
    file_path: impl Into<String>,
  ) -> Self {
    DefinedFunction {
      name: name.into(),
      namespace: namespace.into(),
      file_path: file_path.into(),
    }
  }

  /// The default entry point: `main` in the entry-point module.
  pub fn entry_point() -> Self {
    DefinedFunction::new("main", "", "")
  }
}

/// One declared function or class, with every call reference observed
/// inside its body (methods and constructors included).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FunctionGraphNode {
  pub func: DefinedFunction,
  /// Source order; duplicates allowed. Order is not part of the public
  /// contract.
  pub called_functions: Vec<DefinedFunction>,
}

/// One import clause, reduced to the shape the resolver consumes.
///
/// The two constructors are the only ways to build an entry, so the mixed
/// form (a namespace alias plus a named list) is not representable.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImportEntry {
  /// The specifier string as written; normalization happens in the
  /// resolver.
  pub file_path: String,
  /// Local binding for namespace-style imports; empty for named imports.
  pub alias: String,
  /// Imported names, or exactly `["*"]` for namespace-style imports.
  pub imports: Vec<String>,
}

impl ImportEntry {
  /// Namespace-style import: `import X from "m"`, `import * as X from "m"`
  /// or a bare `import "m"` (empty alias).
  pub fn namespace(file_path: impl Into<String>, alias: impl Into<String>) -> Self {
    ImportEntry {
      file_path: file_path.into(),
      alias: alias.into(),
      imports: vec!["*".to_string()],
    }
  }

  /// Named import: `import {a, b} from "m"`.
  pub fn named(file_path: impl Into<String>, imports: Vec<String>) -> Self {
    ImportEntry {
      file_path: file_path.into(),
      alias: String::new(),
      imports,
    }
  }

  /// Whether this entry binds every export of the module behind `alias`.
  pub fn is_namespace(&self) -> bool {
    self.imports.iter().any(|name| name == "*")
  }
}

/// One source file's parsed form, labeled by its normalized path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParsedModule {
  pub file_path: String,
  pub imported_modules: Vec<ImportEntry>,
  pub function_tree: Vec<FunctionGraphNode>,
}

/// The two disjoint outputs of reachability.
///
/// Resolved functions have a visible declaration that was followed;
/// unresolved ones are charged against the cost table (or silently drop
/// out, contributing nothing).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FunctionCalls {
  pub resolved_functions: Vec<DefinedFunction>,
  pub unresolved_functions: Vec<DefinedFunction>,
}
