//! Step-numbered checkpoints of variable stores.
//!
//! Each checkpoint is a directory `ckpt-<step>` holding one
//! `<name>.safetensors` file per saved variable store.

use std::fs;
use std::path::{Path, PathBuf};

use tch::nn;
use tracing::debug;

use crate::error::Result;

const CHECKPOINT_PREFIX: &str = "ckpt-";

/// A checkpoint on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Global step the checkpoint was taken at.
    pub step: u64,
    /// Checkpoint directory.
    pub path: PathBuf,
}

impl Checkpoint {
    /// File holding the variable store saved under `name`.
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}.safetensors"))
    }
}

/// Writes, lists, prunes and restores checkpoints in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
    max_to_keep: usize,
}

impl CheckpointManager {
    /// Creates a manager for `dir`, creating the directory if needed.
    ///
    /// At most `max_to_keep` checkpoints are retained; 0 keeps all.
    pub fn new(dir: impl AsRef<Path>, max_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_to_keep })
    }

    /// Returns the checkpoint directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maximum number of retained checkpoints (0 = unlimited).
    pub fn max_to_keep(&self) -> usize {
        self.max_to_keep
    }

    /// Saves the named stores as the checkpoint for `step`, then removes
    /// the oldest checkpoints beyond the retention limit.
    pub fn save(&self, step: u64, stores: &[(&str, &nn::VarStore)]) -> Result<Checkpoint> {
        let checkpoint = Checkpoint {
            step,
            path: self.dir.join(format!("{CHECKPOINT_PREFIX}{step}")),
        };
        fs::create_dir_all(&checkpoint.path)?;
        for (name, vs) in stores {
            vs.save(checkpoint.store_path(name))?;
        }
        debug!(step, path = %checkpoint.path.display(), "wrote checkpoint");
        self.prune()?;
        Ok(checkpoint)
    }

    /// Lists checkpoints sorted by step. Unrelated entries are ignored.
    pub fn list(&self) -> Result<Vec<Checkpoint>> {
        let mut checkpoints = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(step) = name
                .to_str()
                .and_then(|n| n.strip_prefix(CHECKPOINT_PREFIX))
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            checkpoints.push(Checkpoint {
                step,
                path: entry.path(),
            });
        }
        checkpoints.sort_by_key(|c| c.step);
        Ok(checkpoints)
    }

    /// Returns the checkpoint with the highest step, if any.
    pub fn latest(&self) -> Result<Option<Checkpoint>> {
        Ok(self.list()?.pop())
    }

    /// Loads every named store from `checkpoint`.
    pub fn restore(
        &self,
        checkpoint: &Checkpoint,
        stores: &mut [(&str, &mut nn::VarStore)],
    ) -> Result<()> {
        for (name, vs) in stores.iter_mut() {
            vs.load(checkpoint.store_path(name))?;
        }
        debug!(step = checkpoint.step, "restored checkpoint");
        Ok(())
    }

    fn prune(&self) -> Result<()> {
        if self.max_to_keep == 0 {
            return Ok(());
        }
        let checkpoints = self.list()?;
        let excess = checkpoints.len().saturating_sub(self.max_to_keep);
        for old in checkpoints.into_iter().take(excess) {
            fs::remove_dir_all(&old.path)?;
            debug!(step = old.step, "removed old checkpoint");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind, Tensor};

    fn store() -> (nn::VarStore, Tensor) {
        let vs = nn::VarStore::new(Device::Cpu);
        let w = vs.root().var("w", &[3], nn::Init::Const(2.0));
        (vs, w)
    }

    fn steps(manager: &CheckpointManager) -> Vec<u64> {
        manager.list().unwrap().iter().map(|c| c.step).collect()
    }

    #[test]
    fn save_writes_store_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5).unwrap();
        let (vs, _) = store();
        let checkpoint = manager.save(7, &[("generators", &vs)]).unwrap();
        assert_eq!(checkpoint.step, 7);
        assert!(checkpoint.store_path("generators").exists());
    }

    #[test]
    fn retention_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), 2).unwrap();
        let (vs, _) = store();
        for step in [1, 2, 10, 3] {
            manager.save(step, &[("s", &vs)]).unwrap();
        }
        assert_eq!(steps(&manager), vec![3, 10]);
        assert_eq!(manager.latest().unwrap().unwrap().step, 10);
    }

    #[test]
    fn zero_retention_keeps_all() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), 0).unwrap();
        let (vs, _) = store();
        for step in 0..4 {
            manager.save(step, &[("s", &vs)]).unwrap();
        }
        assert_eq!(steps(&manager), vec![0, 1, 2, 3]);
    }

    #[test]
    fn unrelated_entries_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("ckpt-latest")).unwrap();
        fs::create_dir(dir.path().join("logs")).unwrap();
        let manager = CheckpointManager::new(dir.path(), 5).unwrap();
        assert!(manager.list().unwrap().is_empty());
        assert!(manager.latest().unwrap().is_none());
    }

    #[test]
    fn restore_loads_saved_values() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5).unwrap();
        let (mut vs, mut w) = store();
        let checkpoint = manager.save(1, &[("s", &vs)]).unwrap();

        tch::no_grad(|| {
            let _ = w.fill_(0.0);
        });
        assert_eq!(f64::try_from(&w.sum(Kind::Float)).unwrap(), 0.0);

        manager.restore(&checkpoint, &mut [("s", &mut vs)]).unwrap();
        assert_eq!(f64::try_from(&w.sum(Kind::Float)).unwrap(), 6.0);
    }

    #[test]
    fn restore_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path(), 5).unwrap();
        let (mut vs, _) = store();
        let checkpoint = manager.save(1, &[("s", &vs)]).unwrap();
        assert!(manager
            .restore(&checkpoint, &mut [("other", &mut vs)])
            .is_err());
    }
}
