// src/utils/text.rs — String helpers handed to plugins

use std::collections::HashMap;
use std::path::Path;

use crate::infra::errors::RelayError;

/// Characters that are unsafe in file names on common platforms.
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace every file-name-unsafe character with `-`.
pub fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// Character-level locale conversion table (e.g. traditional → simplified).
///
/// An empty table is the identity conversion.
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    map: HashMap<char, char>,
}

impl LocaleTable {
    pub fn new(map: HashMap<char, char>) -> Self {
        Self { map }
    }

    /// Load a JSON object of single-character keys and values.
    ///
    /// Entries whose key or value is not exactly one character are skipped.
    pub fn load_from(path: &Path) -> Result<Self, RelayError> {
        let content = std::fs::read_to_string(path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;

        let mut map = HashMap::with_capacity(raw.len());
        for (k, v) in raw {
            let mut kc = k.chars();
            let mut vc = v.chars();
            match (kc.next(), kc.next(), vc.next(), vc.next()) {
                (Some(from), None, Some(to), None) => {
                    map.insert(from, to);
                }
                _ => tracing::debug!("Skipping locale table entry {:?} -> {:?}", k, v),
            }
        }
        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn convert(&self, s: &str) -> String {
        if self.map.is_empty() {
            return s.to_string();
        }
        s.chars()
            .map(|c| self.map.get(&c).copied().unwrap_or(c))
            .collect()
    }
}
