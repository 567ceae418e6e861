use crate::rules::Kind;

/// The renderer cannot start with its current configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no render rule registered for: {}", names(.missing))]
    MissingRules { missing: Vec<Kind> },
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
}

fn names(kinds: &[Kind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}
