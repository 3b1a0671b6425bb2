//! Static RAM-cost analysis for in-game scripts.
//!
//! Given an entry-point script, the other scripts it can import, and a
//! host-supplied [`CostTable`], the analyzer reports the RAM that must be
//! charged before the script may run, with a per-API breakdown.
//!
//! The pipeline is strictly linear and deliberately shallow:
//!
//! 1. [`parse_script`] walks the `parse-js` AST of one file and extracts,
//!    per top-level function or class, the call references inside it. The
//!    match is syntactic only; values are never followed through
//!    assignments, destructuring or returns.
//! 2. [`parse_all`] forms the transitive import closure, resolving
//!    specifiers against the supplied scripts or, for `http(s)://`
//!    specifiers, through a [`RemoteModuleLoader`].
//! 3. [`find_all_called_functions`] traverses the combined graph from the
//!    entry function, splitting everything it reaches into locally
//!    resolved functions and unresolved ones, presumed to be platform API
//!    calls.
//! 4. [`cost::compute_cost`] deduplicates the unresolved set and folds it
//!    against the cost table, with the always-charged namespaces and the
//!    player-dependent entries as the two side channels.
//!
//! Nothing is cached across invocations and no input is mutated. The
//! analyzer is intentionally unsound: it matches the shape of the rule the
//! game teaches, not the semantics of the language.

pub mod cost;
pub mod error;
pub mod graph;
pub mod link;
pub mod parse;
pub mod reach;

pub use cost::compute_cost;
pub use cost::Cost;
pub use cost::CostTable;
pub use cost::RamCalculation;
pub use cost::RamUsageEntry;
pub use cost::RamUsageKind;
pub use error::RamAnalysisError;
pub use graph::DefinedFunction;
pub use graph::FunctionCalls;
pub use graph::FunctionGraphNode;
pub use graph::ImportEntry;
pub use graph::ParsedModule;
pub use link::imports_equal;
pub use link::parse_all;
pub use link::RemoteImportsDisabled;
pub use link::RemoteModuleLoader;
pub use link::Script;
pub use link::ScriptFile;
pub use parse::parse_script;
pub use reach::find_all_called_functions;

use tracing::debug;

/// Computes the RAM charge for `code`, refusing remote imports.
///
/// Equivalent to [`calculate_ram_usage_with_loader`] with a loader that
/// fails every `http(s)://` specifier.
pub fn calculate_ram_usage<P, S: ScriptFile>(
  table: &CostTable<P>,
  player: &P,
  code: &str,
  other_scripts: &[S],
) -> RamCalculation {
  calculate_ram_usage_with_loader(table, player, code, other_scripts, &RemoteImportsDisabled)
}

/// Computes the RAM charge for `code`, resolving remote imports through
/// `loader`.
///
/// Never fails: any [`RamAnalysisError`] is folded into a negative cost
/// code with no breakdown, so the host can render the failure in place of
/// a number.
pub fn calculate_ram_usage_with_loader<P, S: ScriptFile>(
  table: &CostTable<P>,
  player: &P,
  code: &str,
  other_scripts: &[S],
  loader: &dyn RemoteModuleLoader,
) -> RamCalculation {
  match analyze(table, player, code, other_scripts, loader) {
    Ok(calculation) => calculation,
    Err(err) => {
      debug!(error = %err, code = err.cost_code(), "ram calculation failed");
      RamCalculation {
        cost: err.cost_code(),
        entries: None,
      }
    }
  }
}

fn analyze<P, S: ScriptFile>(
  table: &CostTable<P>,
  player: &P,
  code: &str,
  other_scripts: &[S],
  loader: &dyn RemoteModuleLoader,
) -> Result<RamCalculation, RamAnalysisError> {
  let modules = parse_all(code, other_scripts, loader)?;
  let calls = find_all_called_functions(&modules, None);
  Ok(compute_cost(table, player, &calls.unresolved_functions))
}
