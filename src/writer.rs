//! Snapshot persistence.
//!
//! The document is written to a sibling temp file and renamed over the
//! target, so readers see either the previous snapshot or the new one.

use crate::config::SnapshotLayout;
use crate::error::WriteError;
use crate::model::{LegacySnapshot, SnapshotDocument};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    layout: SnapshotLayout,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>, layout: SnapshotLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self, document: &SnapshotDocument) -> Result<Vec<u8>, WriteError> {
        let bytes = match self.layout {
            SnapshotLayout::Buckets => serde_json::to_vec_pretty(document)?,
            SnapshotLayout::Legacy => {
                serde_json::to_vec_pretty(&LegacySnapshot::from(document))?
            }
        };
        Ok(bytes)
    }

    pub fn write(&self, document: &SnapshotDocument) -> Result<(), WriteError> {
        let bytes = self.render(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, &bytes).map_err(|e| self.io_error(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(self.io_error(&self.path, e));
        }

        info!(
            "Wrote snapshot to {} ({} fixtures, {} bytes)",
            self.path.display(),
            document.len(),
            bytes.len()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> WriteError {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LifecycleBucket, PriceTriple, Provenance, RawFixture, ReconciledFixture};
    use chrono::{TimeZone, Utc};
    use tokio_test::assert_ok;

    fn document() -> SnapshotDocument {
        SnapshotDocument::empty(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_write_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("dados_futebol.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        let writer = SnapshotWriter::new(&path, SnapshotLayout::Buckets);
        assert_ok!(writer.write(&document()));

        let written: SnapshotDocument =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, document());
        assert!(!dir.path().join("out").join("dados_futebol.json.tmp").exists());
    }

    #[test]
    fn test_write_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("snap.json");
        let writer = SnapshotWriter::new(&path, SnapshotLayout::Buckets);
        assert_ok!(writer.write(&document()));
        assert!(path.exists());
    }

    #[test]
    fn test_legacy_layout_keys() {
        let writer = SnapshotWriter::new("unused.json", SnapshotLayout::Legacy);
        let value: serde_json::Value =
            serde_json::from_slice(&writer.render(&document()).unwrap()).unwrap();
        assert!(value.get("resultados").is_some());
        assert!(value.get("proximos").is_some());
        assert!(value.get("upcoming").is_none());
    }

    #[test]
    fn test_legacy_layout_flat_record_for_priced_fixture() {
        let mut doc = document();
        let raw = RawFixture {
            id: 101,
            kickoff: Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap(),
            status: "SCHEDULED".to_string(),
            competition_name: "Campeonato Brasileiro Série A".to_string(),
            competition_code: "BSA".to_string(),
            home_team: "Flamengo".to_string(),
            away_team: "Vasco da Gama".to_string(),
            home_crest: "https://crests.football-data.org/1783.png".to_string(),
            away_crest: "https://crests.football-data.org/1780.png".to_string(),
            home_goals: None,
            away_goals: None,
        };
        let mut rec = ReconciledFixture::unpriced(raw, LifecycleBucket::Upcoming);
        rec.price = PriceTriple::checked(1.80, 3.40, 4.20);
        rec.price_source = Some(Provenance::Real {
            bookmaker: "pinnacle".to_string(),
        });
        doc.upcoming.push(rec);

        let writer = SnapshotWriter::new("unused.json", SnapshotLayout::Legacy);
        let value: serde_json::Value =
            serde_json::from_slice(&writer.render(&doc).unwrap()).unwrap();
        let game = &value["proximos"][0];

        assert_eq!(game["id"], 101);
        assert_eq!(game["data"], "2024-05-01T22:00:00Z");
        assert_eq!(game["liga"], "Campeonato Brasileiro Série A");
        assert_eq!(game["time_casa"], "Flamengo");
        assert_eq!(game["time_fora"], "Vasco da Gama");
        assert_eq!(game["odds_casa"], 1.80);
        assert_eq!(game["odds_empate"], 3.40);
        assert_eq!(game["odds_fora"], 4.20);
        assert_eq!(game["brasao_fora"], "https://crests.football-data.org/1780.png");
        assert!(game["placar_casa"].is_null());
        assert!(game["placar_fora"].is_null());
        assert_eq!(game["fonte_odds"], "real:pinnacle");
        assert!(game.get("price").is_none());
        assert!(game.get("home_team").is_none());
    }
}
