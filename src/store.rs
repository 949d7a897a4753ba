//! Plain text persistence for variables, one `name=value` per line.

use crate::engine::is_valid_name;
use crate::error::{CalcError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_FILE: &str = "variables.txt";

pub fn save(variables: &BTreeMap<String, f64>, path: &Path) -> Result<()> {
    let io_error = |source: std::io::Error| CalcError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let contents: String = variables
        .iter()
        .map(|(name, value)| format!("{}={}\n", name, value))
        .collect();
    fs::write(path, contents).map_err(io_error)?;
    info!("Saved {} variables to {}", variables.len(), path.display());
    Ok(())
}

/// Reads a variable file. Lines that are not a valid `name=value` pair are skipped.
pub fn load(path: &Path) -> Result<BTreeMap<String, f64>> {
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => CalcError::FileNotFound(path.to_path_buf()),
        _ => CalcError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let mut variables = BTreeMap::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some((name, value)) => {
                variables.insert(name.to_string(), value);
            }
            None => debug!("Skipping line {} of {}: {:?}", number + 1, path.display(), line),
        }
    }
    info!("Loaded {} variables from {}", variables.len(), path.display());
    Ok(variables)
}

fn parse_line(line: &str) -> Option<(&str, f64)> {
    let mut parts = line.split('=');
    let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let name = name.trim();
    let value: f64 = value.trim().parse().ok()?;
    (is_valid_name(name) && value.is_finite()).then_some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExpressionEngine;

    #[test]
    fn test_round_trip_into_fresh_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);

        let mut engine = ExpressionEngine::new();
        engine.evaluate("1/3").unwrap();
        engine.save_variable("third").unwrap();
        engine.evaluate("0-1234.5").unwrap();
        engine.save_variable("neg").unwrap();
        engine.evaluate("0.1+0.2").unwrap();
        engine.save_variable("sum").unwrap();
        save(engine.variables(), &path).unwrap();

        let mut fresh = ExpressionEngine::new();
        fresh.replace_variables(load(&path).unwrap());
        assert_eq!(fresh.variables(), engine.variables());
    }

    #[test]
    fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vars.txt");
        let variables = BTreeMap::from([("b".to_string(), 2.5), ("a".to_string(), -1.0)]);
        save(&variables, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a=-1\nb=2.5\n");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        fs::write(
            &path,
            "x=1\n\nnovalue\na=b=3\ny=abc\nz=\nUpper=4\nbig=inf\n  w = 7 \nq=1e3\n",
        )
        .unwrap();
        let variables = load(&path).unwrap();
        assert_eq!(
            variables,
            BTreeMap::from([
                ("q".to_string(), 1000.0),
                ("w".to_string(), 7.0),
                ("x".to_string(), 1.0),
            ])
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(matches!(load(&path), Err(CalcError::FileNotFound(p)) if p == path));
    }

    #[test]
    fn test_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        save(&BTreeMap::new(), &path).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }
}
