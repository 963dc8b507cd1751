use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::{GraphSnapshot, Scope, parse_snapshot};

/// Read and normalize a snapshot file, then apply the requested scope.
/// A snapshot that parses to zero entities is a valid (empty) result, not
/// an error; the caller renders a distinct empty state for it.
pub fn load_snapshot(path: &Path, scope: &Scope) -> Result<GraphSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot file {}", path.display()))?;
    let snapshot = parse_snapshot(&raw)
        .with_context(|| format!("failed to parse snapshot file {}", path.display()))?;

    match scope {
        Scope::Global => Ok(snapshot),
        Scope::Neighborhood {
            center,
            depth,
            max_nodes,
        } => snapshot
            .neighborhood(center, *depth, *max_nodes)
            .ok_or_else(|| anyhow!("focus entity {center:?} is not present in the snapshot")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("entilens-{name}-{}.json", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_global_scope() {
        let path = write_temp(
            "global",
            r#"{"entities": [{"id": "A"}, {"id": "B"}],
                "relationships": [{"from": "A", "to": "B"}]}"#,
        );
        let snapshot = load_snapshot(&path, &Scope::Global).unwrap();
        assert_eq!(snapshot.entity_count(), 2);
        fs::remove_file(path).ok();
    }

    #[test]
    fn loads_neighborhood_scope() {
        let path = write_temp(
            "neighborhood",
            r#"{"entities": [{"id": "A"}, {"id": "B"}, {"id": "C"}],
                "relationships": [{"from": "A", "to": "B"}, {"from": "B", "to": "C"}]}"#,
        );
        let scope = Scope::Neighborhood {
            center: "A".to_owned(),
            depth: 1,
            max_nodes: 10,
        };
        let snapshot = load_snapshot(&path, &scope).unwrap();
        assert_eq!(snapshot.entity_count(), 2);
        fs::remove_file(path).ok();
    }

    #[test]
    fn unknown_focus_entity_is_an_error() {
        let path = write_temp("badfocus", r#"{"entities": [{"id": "A"}]}"#);
        let scope = Scope::Neighborhood {
            center: "ghost".to_owned(),
            depth: 2,
            max_nodes: 10,
        };
        assert!(load_snapshot(&path, &scope).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/entilens-snapshot.json");
        assert!(load_snapshot(&path, &Scope::Global).is_err());
    }
}
