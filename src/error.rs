use parse_js::error::SyntaxError;
use thiserror::Error;

/// Failure modes of RAM analysis.
///
/// The two lower-level operations ([`crate::parse_script`] and
/// [`crate::parse_all`]) let these escape; the top-level
/// [`crate::calculate_ram_usage`] folds them into a negative cost via
/// [`RamAnalysisError::cost_code`] so the host UI can render the failure in
/// place of a number.
#[derive(Debug, Error)]
pub enum RamAnalysisError {
  /// The AST front end rejected a module's source text.
  #[error("syntax error in \"{path}\": {source}")]
  Syntax { path: String, source: SyntaxError },
  /// An import specifier matched no script in the supplied file set.
  #[error("could not find imported script \"{path}\"")]
  Import { path: String },
  /// Fetching or degrading a remote module failed.
  #[error("failed to import module from \"{url}\": {reason}")]
  UrlImport { url: String, reason: String },
}

impl RamAnalysisError {
  /// Stable numeric code reported to the host in place of a cost.
  pub fn cost_code(&self) -> f64 {
    match self {
      RamAnalysisError::Syntax { .. } => -1.0,
      RamAnalysisError::Import { .. } => -2.0,
      RamAnalysisError::UrlImport { .. } => -3.0,
    }
  }
}
