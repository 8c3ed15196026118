//! Raw observed names (process names, domains) are mapped to the names shown in reports.
//! The mapping is a flat JSON object, for example `{"Code": "VS Code", "www.github.com": "github.com"}`.

use std::{collections::HashMap, io::ErrorKind, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AliasMap(HashMap<String, String>);

impl AliasMap {
    /// Reads the alias file. Never fails: a missing or broken file yields an empty mapping.
    pub fn load(path: &Path) -> AliasMap {
        let content = match std::fs::read_to_string(path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No alias file found at {path:?}, continuing without aliases");
                return AliasMap::default();
            }
            Err(e) => {
                warn!("Failed to read alias file {path:?}: {e}");
                return AliasMap::default();
            }
        };

        match serde_json::from_str::<AliasMap>(&content) {
            Ok(map) => {
                info!("Loaded {} aliases from {path:?}", map.0.len());
                map
            }
            Err(e) => {
                warn!("Error parsing alias file {path:?}: {e}");
                AliasMap::default()
            }
        }
    }

    /// Single lookup, aliases are not chained. Unmapped names resolve to themselves.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::{tempdir, NamedTempFile};

    use crate::utils::logging::TEST_LOGGING;

    use super::AliasMap;

    #[test]
    fn missing_file_yields_empty_map() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let map = AliasMap::load(&dir.path().join("aliases.json"));
        assert!(map.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_file_yields_empty_map() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"{\"Code\": ")?;
        assert!(AliasMap::load(file.path()).is_empty());

        let mut file = NamedTempFile::new()?;
        file.write_all(b"[\"Code\"]")?;
        assert!(AliasMap::load(file.path()).is_empty());
        Ok(())
    }

    #[test]
    fn loads_flat_object() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(br#"{"Code": "VS Code", "www.github.com": "github.com"}"#)?;
        let map = AliasMap::load(file.path());
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("Code"), "VS Code");
        assert_eq!(map.resolve("www.github.com"), "github.com");
        Ok(())
    }

    #[test]
    fn unmapped_names_resolve_to_themselves() {
        let map = AliasMap::from_iter([("Code", "VS Code")]);
        assert_eq!(map.resolve("firefox"), "firefox");
        assert_eq!(AliasMap::default().resolve(""), "");
    }

    #[test]
    fn resolution_is_a_single_lookup() {
        let map = AliasMap::from_iter([("a", "b"), ("b", "c")]);
        assert_eq!(map.resolve("a"), "b");
        assert_eq!(map.resolve("b"), "c");
        assert_eq!(map.resolve("c"), "c");
    }
}
