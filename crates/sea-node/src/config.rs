//! Node Configuration
//!
//! Game parameters come from an optional JSON file; anything the file
//! does not set falls back to the built-in defaults. An unreadable or
//! invalid file is a startup error, never a silent fallback.

use std::path::Path;

use anyhow::Context;
use sea_program::GameParams;

/// Load game parameters from a JSON file, or defaults when no path is given
pub fn load_params(path: Option<&Path>) -> anyhow::Result<GameParams> {
    let params: GameParams = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading game params from {path:?}"))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing game params in {path:?}"))?
        }
        None => GameParams::default(),
    };
    params.validate().context("invalid game params")?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_no_path_gives_defaults() {
        let params = load_params(None).unwrap();
        assert_eq!(params, GameParams::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"max_level": 9, "chest_reward": 75}}"#).unwrap();

        let params = load_params(Some(&path)).unwrap();
        assert_eq!(params.max_level, 9);
        assert_eq!(params.chest_reward, 75);
        assert_eq!(params.shoot_toll, GameParams::default().shoot_toll);
    }

    #[test]
    fn test_invalid_params_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut file = std::fs::File::create(&path).unwrap();
        // area_toll must exceed shoot_toll
        write!(file, r#"{{"shoot_toll": 50, "area_toll": 10}}"#).unwrap();

        assert!(load_params(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load_params(Some(&path)).is_err());
    }
}
