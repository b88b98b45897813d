//! Configuration errors surfaced by the `Set*` operations.

use std::path::PathBuf;

/// A host payload or config file that could not be applied.
///
/// Raised before any table is touched, so the previous vocabulary and
/// catalog stay in effect.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed {what} payload: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn malformed(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| ConfigError::Malformed { what, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_names_the_payload() {
        let err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err = ConfigError::malformed("keywords")(err);
        assert!(err.to_string().starts_with("malformed keywords payload"));
    }
}
