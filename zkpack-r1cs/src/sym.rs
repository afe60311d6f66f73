//! Symbol table: the compiler's `.sym` companion file.
//!
//! Newline-delimited CSV, four columns: `labelIdx,varIdx,componentIdx,name`.
//! Lines with any other column count are skipped. The table is purely
//! informational and never affects satisfaction.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Location of one named signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub label: i64,
    pub wire: i64,
    pub component: i64,
}

/// Name-to-location map with deterministic iteration order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.entries.insert(name.into(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Parse the CSV text. Malformed lines (wrong column count, non-numeric
    /// indices) are skipped, matching the tolerant reader the original
    /// tooling uses.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        let mut skipped = 0usize;
        for line in text.lines() {
            let cols: Vec<&str> = line.split(',').collect();
            if cols.len() != 4 {
                skipped += 1;
                continue;
            }
            let (label, wire, component) = match (
                cols[0].trim().parse::<i64>(),
                cols[1].trim().parse::<i64>(),
                cols[2].trim().parse::<i64>(),
            ) {
                (Ok(l), Ok(w), Ok(c)) => (l, w, c),
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            table.insert(
                cols[3].to_string(),
                Symbol {
                    label,
                    wire,
                    component,
                },
            );
        }
        if skipped > 0 {
            debug!(skipped, "skipped malformed symbol lines");
        }
        table
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read symbol file: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Serialize back to CSV. Entries are emitted in ascending label order
    /// so the output is reproducible.
    pub fn to_csv(&self) -> String {
        let mut rows: Vec<(&str, &Symbol)> = self.iter().collect();
        rows.sort_by_key(|(_, s)| (s.label, s.wire));
        let mut out = String::new();
        for (name, s) in rows {
            out.push_str(&format!("{},{},{},{}\n", s.label, s.wire, s.component, name));
        }
        out
    }

    /// Write the CSV atomically (`.tmp` then rename), like the binary
    /// format writers.
    pub fn store(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, self.to_csv())
            .with_context(|| format!("failed to write symbol file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!("failed to rename {} -> {}", tmp_path.display(), path.display())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_bad_lines() {
        let text = "0,0,0,one\n\
                    1,1,2,main.x\n\
                    garbage line\n\
                    1,2\n\
                    a,b,c,main.bad\n\
                    3,3,2,main.y\n";
        let table = SymbolTable::parse(text);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get("main.x"),
            Some(&Symbol {
                label: 1,
                wire: 1,
                component: 2
            })
        );
        assert!(table.get("main.bad").is_none());
    }

    #[test]
    fn test_csv_roundtrip() {
        let mut table = SymbolTable::new();
        table.insert(
            "main.x",
            Symbol {
                label: 1,
                wire: 1,
                component: 2,
            },
        );
        table.insert(
            "k[0]",
            Symbol {
                label: 7,
                wire: 5,
                component: 6,
            },
        );
        let reparsed = SymbolTable::parse(&table.to_csv());
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.get("k[0]"), table.get("k[0]"));
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("circuit.sym");
        let mut table = SymbolTable::new();
        table.insert(
            "main.out",
            Symbol {
                label: 2,
                wire: 1,
                component: 1,
            },
        );
        table.store(&path).unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());
        let loaded = SymbolTable::load(&path).unwrap();
        assert_eq!(loaded.get("main.out"), table.get("main.out"));
    }
}
