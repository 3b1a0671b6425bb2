//! Reachability over the multi-module call graph.

use crate::graph::DefinedFunction;
use crate::graph::FunctionCalls;
use crate::graph::FunctionGraphNode;
use crate::graph::ParsedModule;
use crate::link::normalize_specifier;
use ahash::HashSet;
use ahash::HashSetExt;
use std::collections::VecDeque;

/// Classifies every function reachable from `entry_point` (default: `main`
/// in the entry-point module) as locally resolved or unresolved.
///
/// Resolved functions have a visible declaration whose edges are followed;
/// unresolved ones are handed to the cost reducer. A popped reference whose
/// module cannot be located is dropped silently: call edges always name
/// their containing module, so only a foreign entry point can miss.
pub fn find_all_called_functions(
  modules: &[ParsedModule],
  entry_point: Option<DefinedFunction>,
) -> FunctionCalls {
  let mut resolved_functions = Vec::new();
  let mut unresolved_functions = Vec::new();
  let mut seen: HashSet<DefinedFunction> = HashSet::new();
  let mut worklist = VecDeque::new();
  worklist.push_back(entry_point.unwrap_or_else(DefinedFunction::entry_point));
  while let Some(current) = worklist.pop_front() {
    // Two callers may enqueue the same function before it is first popped;
    // classify it once.
    if seen.contains(&current) {
      continue;
    }
    let Some(module) = modules
      .iter()
      .find(|module| module.file_path == current.file_path)
    else {
      continue;
    };
    let declaration = module
      .function_tree
      .iter()
      .find(|node| node.func == current)
      .or_else(|| imported_declaration(modules, module, &current));
    seen.insert(current.clone());
    match declaration {
      Some(node) => {
        for callee in node.called_functions.iter() {
          if !seen.contains(callee) {
            worklist.push_back(callee.clone());
          }
        }
        resolved_functions.push(current);
      }
      None => unresolved_functions.push(current),
    }
  }
  FunctionCalls {
    resolved_functions,
    unresolved_functions,
  }
}

// The first import binding `current.namespace` that names `current.name`
// (or everything, via `"*"`) decides where to look; a named declaration in
// the referenced module resolves the call.
fn imported_declaration<'a>(
  modules: &'a [ParsedModule],
  importer: &'a ParsedModule,
  current: &DefinedFunction,
) -> Option<&'a FunctionGraphNode> {
  let import = importer.imported_modules.iter().find(|entry| {
    entry.alias == current.namespace
      && (entry.is_namespace() || entry.imports.iter().any(|name| name == &current.name))
  })?;
  let path = normalize_specifier(&import.file_path);
  let target = modules.iter().find(|module| module.file_path == path)?;
  target
    .function_tree
    .iter()
    .find(|node| node.func.name == current.name && node.func.namespace.is_empty())
}

#[cfg(test)]
mod tests {
  use super::find_all_called_functions;
  use crate::graph::DefinedFunction;
  use crate::link::parse_all;
  use crate::link::RemoteImportsDisabled;
  use crate::link::Script;

  fn names(functions: &[DefinedFunction]) -> Vec<&str> {
    functions.iter().map(|f| f.name.as_str()).collect()
  }

  #[test]
  fn locally_declared_callees_resolve_and_are_followed() {
    let modules = parse_all(
      concat!(
        "export async function main(ns) { await prep(ns); }\n",
        "async function prep(ns) { await ns.grow(\"n00dles\"); }\n",
      ),
      &Vec::<Script>::new(),
      &RemoteImportsDisabled,
    )
    .unwrap();
    let calls = find_all_called_functions(&modules, None);
    assert!(names(&calls.resolved_functions).contains(&"main"));
    assert!(names(&calls.resolved_functions).contains(&"prep"));
    assert!(names(&calls.unresolved_functions).contains(&"grow"));
  }

  #[test]
  fn named_imports_resolve_across_modules() {
    let scripts = vec![Script::new(
      "lib.js",
      "export async function doHack(ns) { await ns.hack(\"n00dles\"); }",
    )];
    let modules = parse_all(
      "import {doHack} from \"./lib\"; export async function main(ns) { await doHack(ns); }",
      &scripts,
      &RemoteImportsDisabled,
    )
    .unwrap();
    let calls = find_all_called_functions(&modules, None);
    assert!(names(&calls.resolved_functions).contains(&"doHack"));
    assert!(names(&calls.unresolved_functions).contains(&"hack"));
  }

  #[test]
  fn namespace_imports_resolve_through_the_alias() {
    let scripts = vec![Script::new(
      "lib.js",
      "export async function doHack(ns) { await ns.hack(\"n00dles\"); }",
    )];
    let modules = parse_all(
      "import * as lib from \"./lib\"; export async function main(ns) { await lib.doHack(ns); }",
      &scripts,
      &RemoteImportsDisabled,
    )
    .unwrap();
    let calls = find_all_called_functions(&modules, None);
    let resolved = &calls.resolved_functions;
    assert!(resolved
      .iter()
      .any(|f| f.name == "doHack" && f.namespace == "lib"));
    assert!(names(&calls.unresolved_functions).contains(&"hack"));
  }

  #[test]
  fn the_output_sets_are_disjoint() {
    let scripts = vec![Script::new(
      "lib.js",
      "export function helper(ns) { ns.hack(\"x\"); helper(ns); }",
    )];
    let modules = parse_all(
      concat!(
        "import {helper} from \"./lib\";\n",
        "export async function main(ns) { helper(ns); helper(ns); ns.hack(\"x\"); }\n",
      ),
      &scripts,
      &RemoteImportsDisabled,
    )
    .unwrap();
    let calls = find_all_called_functions(&modules, None);
    for resolved in calls.resolved_functions.iter() {
      assert!(
        !calls.unresolved_functions.contains(resolved),
        "{resolved:?} classified twice"
      );
    }
  }

  #[test]
  fn an_entry_point_without_a_module_yields_nothing() {
    let calls = find_all_called_functions(&[], None);
    assert!(calls.resolved_functions.is_empty());
    assert!(calls.unresolved_functions.is_empty());
  }

  #[test]
  fn a_missing_entry_function_is_unresolved() {
    let modules = parse_all("const x = 1;", &Vec::<Script>::new(), &RemoteImportsDisabled).unwrap();
    let calls = find_all_called_functions(&modules, None);
    assert!(calls.resolved_functions.is_empty());
    assert_eq!(names(&calls.unresolved_functions), vec!["main"]);
  }
}
