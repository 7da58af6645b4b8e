use std::path::Path;

use promptopt_core::Champion;
use promptopt_support::write_text_atomic;
use tracing::warn;

/// Loads the champion from `path`, seeding a fresh one from `default_base`
/// when the file is absent or unparseable. Corruption is logged, never
/// propagated: the Loop Orchestrator always has a champion to evaluate.
pub fn load_or_seed(path: &Path, default_base: &str, now: i64) -> Champion {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Champion>(&contents) {
            Ok(champion) => champion,
            Err(error) => {
                warn!(path = %path.display(), %error, "champion file corrupt, seeding default");
                Champion::seeded(default_base, "", now)
            }
        },
        Err(_) => Champion::seeded(default_base, "", now),
    }
}

pub fn save(path: &Path, champion: &Champion) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(champion)?;
    write_text_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_load_seeds_default_when_file_absent() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("champion.json");
        let champion = load_or_seed(&path, "base rules", 0);
        assert_eq!(champion.base, "base rules");
        assert_eq!(champion.patch, "");
    }

    #[test]
    fn unit_save_then_load_round_trips() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("champion.json");
        let champion = Champion::seeded("base", "v1", 100);
        save(&path, &champion).expect("save");
        let loaded = load_or_seed(&path, "base", 0);
        assert_eq!(loaded.patch, "v1");
    }

    #[test]
    fn unit_load_seeds_default_on_corrupt_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("champion.json");
        std::fs::write(&path, "not json").expect("write corrupt file");
        let champion = load_or_seed(&path, "base rules", 0);
        assert_eq!(champion.base, "base rules");
    }
}
