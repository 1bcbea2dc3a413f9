//! Sets of characters consumed by a single trie step.

/// What one step accepts. Doubles as the label of the edge that created a node.
///
/// Character lists are sorted and deduplicated, one entry per character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CharSet {
    /// Any character: the wildcard edge.
    Any,
    /// Exactly these characters: literal edges.
    Only(Vec<char>),
    /// Anything but these characters: a negated-character edge group.
    Except(Vec<char>),
}

impl CharSet {
    pub fn only(chars: impl IntoIterator<Item = char>) -> Self {
        CharSet::Only(normalize(chars))
    }

    pub fn except(chars: impl IntoIterator<Item = char>) -> Self {
        let chars = normalize(chars);
        if chars.is_empty() {
            CharSet::Any
        } else {
            CharSet::Except(chars)
        }
    }

    /// Number of characters stored for this set (not the number it accepts).
    pub fn stored_len(&self) -> usize {
        match self {
            CharSet::Any => 0,
            CharSet::Only(chars) | CharSet::Except(chars) => chars.len(),
        }
    }

    pub fn union(self, other: CharSet) -> CharSet {
        match (self, other) {
            (CharSet::Any, _) | (_, CharSet::Any) => CharSet::Any,
            (CharSet::Only(a), CharSet::Only(b)) => CharSet::only(a.into_iter().chain(b)),
            (CharSet::Only(a), CharSet::Except(b)) | (CharSet::Except(b), CharSet::Only(a)) => {
                CharSet::except(b.into_iter().filter(|c| a.binary_search(c).is_err()))
            }
            (CharSet::Except(a), CharSet::Except(b)) => {
                CharSet::except(a.into_iter().filter(|c| b.binary_search(c).is_ok()))
            }
        }
    }

    /// The characters this set rejects, `None` when it rejects nothing.
    pub fn complement(&self) -> Option<CharSet> {
        match self {
            CharSet::Any => None,
            CharSet::Only(chars) => Some(CharSet::except(chars.iter().copied())),
            CharSet::Except(chars) => Some(CharSet::Only(chars.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CharSet::Only(chars) if chars.is_empty())
    }
}

fn normalize(chars: impl IntoIterator<Item = char>) -> Vec<char> {
    let mut chars: Vec<char> = chars.into_iter().collect();
    chars.sort_unstable();
    chars.dedup();
    chars
}
