//! Registration limits.

use serde::{Deserialize, Serialize};

/// Bounds applied while compiling constraints into the trie.
///
/// Derives serde so a route table loader can read it next to its routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Largest repeat bound (`{n,m}`, and the unrolled prefix of `+`).
    pub max_repeat: u32,
    /// Largest number of characters one class may expand into.
    pub max_class_size: usize,
    /// Largest number of trie nodes, the root included.
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_repeat: 100,
            max_class_size: 4096,
            max_nodes: 1 << 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_repeat, 100);
        assert_eq!(limits.max_class_size, 4096);
        assert_eq!(limits.max_nodes, 1 << 24);
    }

    #[test]
    fn test_partial_toml() {
        let limits: Limits = toml::from_str("max_repeat = 8").unwrap();
        assert_eq!(limits.max_repeat, 8);
        assert_eq!(limits.max_class_size, 4096, "missing keys fall back to defaults");
    }

    #[test]
    fn test_toml_round_trip() {
        let limits = Limits {
            max_repeat: 3,
            max_class_size: 64,
            max_nodes: 1000,
        };
        let text = toml::to_string(&limits).unwrap();
        assert_eq!(toml::from_str::<Limits>(&text).unwrap(), limits);
    }
}
