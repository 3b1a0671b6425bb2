//! Module parser: one `parse-js` run per file, then a single top-level walk
//! that turns import clauses into [`ImportEntry`]s and declared
//! functions/classes into [`FunctionGraphNode`]s.
//!
//! The call extraction is purely syntactic. It matches on the shape of a
//! callee and never follows values through bindings; assigning
//! `const g = ns.stanek.get` charges at the assignment because the member
//! reference itself is recorded, while the later `g(0, 0)` records a bare
//! identifier that no cost entry matches.

use crate::error::RamAnalysisError;
use crate::graph::DefinedFunction;
use crate::graph::FunctionGraphNode;
use crate::graph::ImportEntry;
use crate::graph::ParsedModule;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_js::ast::expr::pat::Pat;
use parse_js::ast::expr::CallExpr;
use parse_js::ast::expr::Expr;
use parse_js::ast::expr::MemberExpr;
use parse_js::ast::expr::UnaryExpr;
use parse_js::ast::import_export::ImportNames;
use parse_js::ast::node::Node;
use parse_js::ast::stmt::decl::PatDecl;
use parse_js::ast::stmt::ImportStmt;
use parse_js::ast::stmt::Stmt;
use parse_js::ast::stx::TopLevel;
use parse_js::operator::OperatorName;
use tracing::instrument;

type CallExprNode = Node<CallExpr>;
type MemberExprNode = Node<MemberExpr>;
type UnaryExprNode = Node<UnaryExpr>;

/// Parses one module and extracts its import list and function graph.
///
/// `file_path` labels every declaration and call reference produced for
/// this module; the entry-point module is labeled with the empty string.
#[instrument(level = "debug", skip_all, fields(file = %file_path))]
pub fn parse_script(code: &str, file_path: &str) -> Result<ParsedModule, RamAnalysisError> {
  let top_level = parse_js::parse(code).map_err(|source| RamAnalysisError::Syntax {
    path: file_path.to_string(),
    source,
  })?;
  Ok(module_of(&top_level, file_path))
}

fn module_of(top_level: &Node<TopLevel>, file_path: &str) -> ParsedModule {
  let mut imported_modules = Vec::new();
  let mut function_tree = Vec::new();
  for stmt in top_level.stx.body.iter() {
    match stmt.stx.as_ref() {
      Stmt::Import(import) => imported_modules.push(import_entry(import)),
      Stmt::FunctionDecl(decl) => {
        // Anonymous default exports have no name to hang a graph node on.
        if let Some(name) = decl.stx.name.as_ref() {
          function_tree.push(graph_node(&name.stx.name, file_path, decl));
        }
      }
      Stmt::ClassDecl(decl) => {
        if let Some(name) = decl.stx.name.as_ref() {
          function_tree.push(graph_node(&name.stx.name, file_path, decl));
        }
      }
      _ => {}
    }
  }
  ParsedModule {
    file_path: file_path.to_string(),
    imported_modules,
    function_tree,
  }
}

fn import_entry(import: &Node<ImportStmt>) -> ImportEntry {
  let module = import.stx.module.clone();
  // A default binding wins over any named list that follows it, so
  // `import X, {a} from "m"` takes the namespace shape keyed on `X`.
  if let Some(default) = import.stx.default.as_ref() {
    return ImportEntry::namespace(module, pat_decl_name(default));
  }
  match import.stx.names.as_ref() {
    Some(ImportNames::All(alias)) => ImportEntry::namespace(module, pat_decl_name(alias)),
    Some(ImportNames::Specific(names)) => ImportEntry::named(
      module,
      names
        .iter()
        .map(|name| name.stx.importable.as_str().to_string())
        .collect(),
    ),
    // Bare `import "m"` keeps the namespace shape with no local binding.
    None => ImportEntry::namespace(module, ""),
  }
}

fn pat_decl_name(decl: &Node<PatDecl>) -> String {
  match decl.stx.pat.stx.as_ref() {
    Pat::Id(id) => id.name.clone(),
    _ => String::new(),
  }
}

fn graph_node<T: Drive>(name: &str, file_path: &str, declaration: &T) -> FunctionGraphNode {
  let mut collector = CallCollector::new(file_path);
  declaration.drive(&mut collector);
  FunctionGraphNode {
    func: DefinedFunction::new(name, "", file_path),
    called_functions: collector.calls,
  }
}

/// Records one [`DefinedFunction`] per call, construction or member
/// reference while a declaration subtree is driven.
///
/// Driving the whole subtree means callee sub-trees are traversed too, so
/// chains such as `new Foo(ns).bar()` produce edges for both `bar` and
/// `Foo`. The same traversal re-records a call's own member callee; the
/// duplicate is permitted by the graph and collapses during reduction.
#[derive(Visitor)]
#[visitor(CallExprNode(enter), MemberExprNode(enter), UnaryExprNode(enter))]
struct CallCollector<'a> {
  file_path: &'a str,
  calls: Vec<DefinedFunction>,
}

impl<'a> CallCollector<'a> {
  fn new(file_path: &'a str) -> Self {
    CallCollector {
      file_path,
      calls: Vec::new(),
    }
  }

  fn record(&mut self, reference: Option<(String, String)>) {
    if let Some((name, namespace)) = reference {
      self
        .calls
        .push(DefinedFunction::new(name, namespace, self.file_path));
    }
  }

  fn enter_call_expr_node(&mut self, node: &CallExprNode) {
    self.record(callee_ref(node.stx.callee.stx.as_ref()));
  }

  // `new X(..)` parses as `Unary(New, Call(..))` and the call rule already
  // fires on the inner call; only argument shapes without one (`new X`)
  // need recording here.
  fn enter_unary_expr_node(&mut self, node: &UnaryExprNode) {
    if node.stx.operator != OperatorName::New {
      return;
    }
    if matches!(node.stx.argument.stx.as_ref(), Expr::Call(_)) {
      return;
    }
    self.record(callee_ref(node.stx.argument.stx.as_ref()));
  }

  // A member reference that is never invoked here still charges: the bound
  // function will be called elsewhere under a name the table cannot see.
  fn enter_member_expr_node(&mut self, node: &MemberExprNode) {
    self.record(Some(member_ref(node)));
  }
}

fn callee_ref(callee: &Expr) -> Option<(String, String)> {
  match callee {
    Expr::Id(id) => Some((id.stx.name.clone(), String::new())),
    Expr::Member(member) => Some(member_ref(member)),
    _ => None,
  }
}

/// The three-case namespace ladder over a member access.
fn member_ref(member: &Node<MemberExpr>) -> (String, String) {
  let name = member.stx.right.clone();
  let namespace = match member.stx.left.stx.as_ref() {
    // Two-deep property chain: `ns.hacknet.purchaseNode`.
    Expr::Member(inner) => match inner.stx.left.stx.as_ref() {
      Expr::Id(object) => format!("{}.{}", object.stx.name, inner.stx.right),
      _ => String::new(),
    },
    // One-deep: `ns.hack`.
    Expr::Id(object) => object.stx.name.clone(),
    // The object is itself produced by a call: `returnNs(ns).get`.
    Expr::Call(call) => id_name(call.stx.callee.stx.as_ref()),
    // ...or by a construction: `new Foo(ns).bar`.
    Expr::Unary(unary) if unary.stx.operator == OperatorName::New => {
      match unary.stx.argument.stx.as_ref() {
        Expr::Call(call) => id_name(call.stx.callee.stx.as_ref()),
        other => id_name(other),
      }
    }
    _ => String::new(),
  };
  (name, namespace)
}

fn id_name(expr: &Expr) -> String {
  match expr {
    Expr::Id(id) => id.stx.name.clone(),
    _ => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::parse_script;
  use crate::graph::ImportEntry;
  use crate::graph::ParsedModule;

  fn parsed(code: &str) -> ParsedModule {
    parse_script(code, "lib").unwrap()
  }

  fn calls_of(code: &str) -> Vec<(String, String)> {
    let module = parse_script(code, "").unwrap();
    assert_eq!(module.function_tree.len(), 1, "expected one declaration");
    module.function_tree[0]
      .called_functions
      .iter()
      .map(|call| (call.name.clone(), call.namespace.clone()))
      .collect()
  }

  fn assert_records(calls: &[(String, String)], name: &str, namespace: &str) {
    assert!(
      calls.iter().any(|(n, ns)| n == name && ns == namespace),
      "expected ({name}, {namespace}) in {calls:?}"
    );
  }

  #[test]
  fn default_import_takes_the_namespace_shape() {
    let module = parsed("import X from \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::namespace(
      "lib", "X"
    )]);
  }

  #[test]
  fn named_import_records_imported_names() {
    let module = parsed("import {a, b} from \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::named(
      "lib",
      vec!["a".to_string(), "b".to_string()]
    )]);
  }

  #[test]
  fn renamed_import_keeps_the_exported_name() {
    let module = parsed("import {a as c} from \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::named(
      "lib",
      vec!["a".to_string()]
    )]);
  }

  #[test]
  fn star_import_takes_the_namespace_shape() {
    let module = parsed("import * as X from \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::namespace(
      "lib", "X"
    )]);
  }

  #[test]
  fn bare_import_has_no_binding() {
    let module = parsed("import \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::namespace(
      "lib", ""
    )]);
  }

  #[test]
  fn mixed_import_is_keyed_on_the_default_binding() {
    let module = parsed("import X, {a} from \"lib\";");
    assert_eq!(module.imported_modules, vec![ImportEntry::namespace(
      "lib", "X"
    )]);
  }

  #[test]
  fn declarations_are_labeled_with_the_module_path() {
    let module = parsed("export async function main(ns) {} class Worker {}");
    let names: Vec<_> = module
      .function_tree
      .iter()
      .map(|node| node.func.name.as_str())
      .collect();
    assert_eq!(names, vec!["main", "Worker"]);
    for node in module.function_tree.iter() {
      assert_eq!(node.func.file_path, "lib");
      assert_eq!(node.func.namespace, "");
    }
  }

  #[test]
  fn top_level_statements_outside_declarations_are_ignored() {
    let module = parsed("ns.hack(\"n00dles\"); const x = 1; function f() {}");
    assert_eq!(module.function_tree.len(), 1);
    assert!(module.function_tree[0].called_functions.is_empty());
  }

  #[test]
  fn bare_identifier_call() {
    let calls = calls_of("function f() { doWork(); }");
    assert_records(&calls, "doWork", "");
  }

  #[test]
  fn one_deep_member_call() {
    let calls = calls_of("export async function main(ns) { await ns.hack(\"n00dles\"); }");
    assert_records(&calls, "hack", "ns");
  }

  #[test]
  fn two_deep_member_call() {
    let calls = calls_of("export async function main(ns) { ns.hacknet.purchaseNode(); }");
    assert_records(&calls, "purchaseNode", "ns.hacknet");
  }

  #[test]
  fn member_reference_without_a_call_is_recorded() {
    let calls = calls_of("export async function main(ns) { const g = ns.stanek.get; g(0, 0); }");
    assert_records(&calls, "get", "ns.stanek");
    assert_records(&calls, "g", "");
  }

  #[test]
  fn call_shaped_object_takes_the_callee_name() {
    let calls = calls_of("function f(ns) { returnNs(ns).get(0, 0); }");
    assert_records(&calls, "get", "returnNs");
    assert_records(&calls, "returnNs", "");
  }

  #[test]
  fn construction_with_arguments() {
    let calls = calls_of("function f(ns) { new Worker(ns); }");
    assert_records(&calls, "Worker", "");
  }

  #[test]
  fn construction_without_arguments() {
    let calls = calls_of("function f() { new Worker; }");
    assert_records(&calls, "Worker", "");
  }

  #[test]
  fn chained_construction_produces_multiple_edges() {
    let calls = calls_of("function f(ns) { new Foo(ns).bar(); }");
    assert_records(&calls, "bar", "Foo");
    assert_records(&calls, "Foo", "");
  }

  #[test]
  fn class_methods_and_constructors_accumulate_on_the_class() {
    let calls = calls_of(concat!(
      "class Worker {\n",
      "  constructor(ns) { ns.hack(\"n00dles\"); }\n",
      "  idle() { this.ns.sleep(1000); }\n",
      "}",
    ));
    assert_records(&calls, "hack", "ns");
    // `this` is not an identifier, so the ladder has no namespace to offer.
    assert_records(&calls, "sleep", "");
  }

  #[test]
  fn calls_inside_nested_closures_attribute_to_the_declaration() {
    let calls = calls_of("export async function main(ns) { [1].map(() => ns.grow(\"x\")); }");
    assert_records(&calls, "grow", "ns");
  }

  #[test]
  fn syntax_errors_surface_with_the_module_path() {
    let err = parse_script("function {", "broken.js").unwrap_err();
    assert_eq!(err.cost_code(), -1.0);
    assert!(err.to_string().contains("broken.js"));
  }
}
