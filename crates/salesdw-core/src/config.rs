use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

fn default_hs() -> usize {
    10_000
}

fn default_vp() -> usize {
    500
}

fn default_stream_sleep_micros() -> u64 {
    100
}

fn default_commit_batch() -> usize {
    1_000
}

/// Overlay read from an optional YAML config file. Every field is optional so
/// the file only needs to mention the knobs it wants to change; anything
/// left out falls through to the compiled-in default and can still be
/// overridden again by a CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub hs: Option<usize>,
    pub vp: Option<usize>,
    pub stream_sleep_micros: Option<u64>,
    pub commit_batch: Option<usize>,
    pub transactional_csv: Option<PathBuf>,
    pub product_master_csv: Option<PathBuf>,
    pub customer_master_csv: Option<PathBuf>,
    pub postgres_url: Option<String>,
}

/// Fully resolved, immutable configuration threaded into the engine at
/// construction. Nothing in the engine reads a process-wide global; every
/// component that needs a tuning knob takes it from this struct.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hash slot cap (`HS`): maximum number of buffered transactions the
    /// joiner will hold admitted at once.
    pub hs: usize,
    /// Partition size (`VP`): maximum rows per product-master partition.
    pub vp: usize,
    /// Producer yield duration, applied every 1,000 rows read.
    pub stream_sleep: Duration,
    /// Facts accumulated before a commit is issued (`COMMIT_BATCH`).
    pub commit_batch: usize,
    pub transactional_csv: PathBuf,
    pub product_master_csv: PathBuf,
    pub customer_master_csv: PathBuf,
}

impl EngineConfig {
    /// Compiled-in defaults, with only the three required file paths
    /// supplied by the caller.
    pub fn with_paths(
        transactional_csv: PathBuf,
        product_master_csv: PathBuf,
        customer_master_csv: PathBuf,
    ) -> Self {
        Self {
            hs: default_hs(),
            vp: default_vp(),
            stream_sleep: Duration::from_micros(default_stream_sleep_micros()),
            commit_batch: default_commit_batch(),
            transactional_csv,
            product_master_csv,
            customer_master_csv,
        }
    }

    /// Apply a YAML overlay on top of the current values, keeping anything
    /// the file doesn't mention.
    pub fn overlay(mut self, file: &ConfigFile) -> Self {
        if let Some(hs) = file.hs {
            self.hs = hs;
        }
        if let Some(vp) = file.vp {
            self.vp = vp;
        }
        if let Some(micros) = file.stream_sleep_micros {
            self.stream_sleep = Duration::from_micros(micros);
        }
        if let Some(commit_batch) = file.commit_batch {
            self.commit_batch = commit_batch;
        }
        if let Some(path) = &file.transactional_csv {
            self.transactional_csv = path.clone();
        }
        if let Some(path) = &file.product_master_csv {
            self.product_master_csv = path.clone();
        }
        if let Some(path) = &file.customer_master_csv {
            self.customer_master_csv = path.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::with_paths("t.csv".into(), "p.csv".into(), "c.csv".into());
        assert_eq!(cfg.hs, 10_000);
        assert_eq!(cfg.vp, 500);
        assert_eq!(cfg.stream_sleep, Duration::from_micros(100));
        assert_eq!(cfg.commit_batch, 1_000);
    }

    #[test]
    fn overlay_only_touches_supplied_fields() {
        let cfg = EngineConfig::with_paths("t.csv".into(), "p.csv".into(), "c.csv".into());
        let file = ConfigFile {
            hs: Some(4),
            ..Default::default()
        };
        let cfg = cfg.overlay(&file);
        assert_eq!(cfg.hs, 4);
        assert_eq!(cfg.vp, 500, "vp should keep its default");
    }
}
