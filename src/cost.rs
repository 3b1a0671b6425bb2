//! Cost table lookup and the reduction from unresolved calls to a charge.

use crate::graph::DefinedFunction;
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;

/// One line of a RAM breakdown.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RamUsageEntry {
  #[cfg_attr(feature = "serde", serde(rename = "type"))]
  pub kind: RamUsageKind,
  pub name: String,
  pub cost: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RamUsageKind {
  Ns,
  Dom,
  Fn,
  Misc,
}

/// Total charge plus its breakdown.
///
/// `entries` is absent when analysis failed; `cost` then carries the
/// negative code from [`crate::error::RamAnalysisError::cost_code`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RamCalculation {
  pub cost: f64,
  pub entries: Option<Vec<RamUsageEntry>>,
}

/// A single cost-table value: a constant, or a function of the player
/// state evaluated at reduction time (never cached across invocations).
pub enum Cost<P> {
  Flat(f64),
  Scaled(Box<dyn Fn(&P) -> f64 + Send + Sync>),
}

impl<P> Cost<P> {
  fn amount(&self, player: &P) -> f64 {
    match self {
      Cost::Flat(cost) => *cost,
      Cost::Scaled(cost) => cost(player),
    }
  }
}

/// Host-supplied, read-only cost data.
///
/// Two levels: bare identifier names at the top, sub-API tables
/// (`hacknet`, `stanek`, ...) below. The four special namespaces carry
/// their own fixed charges, applied when the namespace is textually
/// present regardless of which member is touched.
pub struct CostTable<P = ()> {
  /// Charged once for every successful calculation.
  pub base_cost: f64,
  pub hacknet_cost: f64,
  pub dom_cost: f64,
  pub corporation_cost: f64,
  top_level: HashMap<String, Cost<P>>,
  apis: HashMap<String, HashMap<String, Cost<P>>>,
}

impl<P> CostTable<P> {
  pub fn new(base_cost: f64) -> Self {
    CostTable {
      base_cost,
      hacknet_cost: 0.0,
      dom_cost: 0.0,
      corporation_cost: 0.0,
      top_level: HashMap::new(),
      apis: HashMap::new(),
    }
  }

  /// Fixed charges for the always-charged namespaces.
  pub fn with_special_costs(mut self, hacknet: f64, dom: f64, corporation: f64) -> Self {
    self.hacknet_cost = hacknet;
    self.dom_cost = dom;
    self.corporation_cost = corporation;
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, cost: Cost<P>) {
    self.top_level.insert(name.into(), cost);
  }

  pub fn insert_api(&mut self, api: impl Into<String>, name: impl Into<String>, cost: Cost<P>) {
    self
      .apis
      .entry(api.into())
      .or_default()
      .insert(name.into(), cost);
  }

  // The two-level lookup: a dotted namespace is keyed by its last segment
  // in the sub-API tables, everything else by the bare name at the top.
  fn lookup(&self, namespace: &str, name: &str) -> Option<&Cost<P>> {
    let segments: Vec<&str> = namespace.split('.').collect();
    if segments.len() > 1 {
      self.apis.get(segments[segments.len() - 1])?.get(name)
    } else {
      self.top_level.get(name)
    }
  }
}

/// Folds the unresolved call set into a total charge and its breakdown.
///
/// Calls are deduplicated structurally, so the same API contributes once
/// no matter how often it appears. Lookups that miss the table still emit
/// their entry with a zero cost; each special namespace is charged once.
pub fn compute_cost<P>(
  table: &CostTable<P>,
  player: &P,
  unresolved: &[DefinedFunction],
) -> RamCalculation {
  let mut entries = vec![RamUsageEntry {
    kind: RamUsageKind::Misc,
    name: "baseCost".to_string(),
    cost: table.base_cost,
  }];
  let mut seen: HashSet<&DefinedFunction> = HashSet::new();
  let mut charged_namespaces: HashSet<&str> = HashSet::new();
  for call in unresolved.iter() {
    if !seen.insert(call) {
      continue;
    }
    if let Some(entry) = special_entry(table, &call.namespace) {
      if charged_namespaces.insert(&call.namespace) {
        entries.push(entry);
      }
      continue;
    }
    let cost = table
      .lookup(&call.namespace, &call.name)
      .map_or(0.0, |cost| cost.amount(player));
    entries.push(RamUsageEntry {
      kind: RamUsageKind::Ns,
      name: call.name.clone(),
      cost,
    });
  }
  RamCalculation {
    cost: entries.iter().map(|entry| entry.cost).sum(),
    entries: Some(entries),
  }
}

// Referencing one of these namespaces is enough to charge, whatever member
// is touched.
fn special_entry<P>(table: &CostTable<P>, namespace: &str) -> Option<RamUsageEntry> {
  let (kind, name, cost) = match namespace {
    "ns.hacknet" => (RamUsageKind::Ns, "hacknet", table.hacknet_cost),
    "document" => (RamUsageKind::Dom, "document", table.dom_cost),
    "window" => (RamUsageKind::Dom, "window", table.dom_cost),
    "ns.corporation" => (RamUsageKind::Ns, "corporation", table.corporation_cost),
    _ => return None,
  };
  Some(RamUsageEntry {
    kind,
    name: name.to_string(),
    cost,
  })
}
