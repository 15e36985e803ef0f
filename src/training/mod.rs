//! Training infrastructure: the adversarial loop and its checkpoints.
//!
//! Provides the generator step schedule, running loss averages,
//! step-numbered checkpoints and the [`GanTrainer`].

pub mod checkpoint;
pub mod progress;
pub mod schedule;
pub mod trainer;

pub use checkpoint::{Checkpoint, CheckpointManager};
pub use progress::{LossAverager, LossRecord, TrainingReport};
pub use schedule::GeneratorStepSchedule;
pub use trainer::{FitOptions, GanTrainer, TrainingConfig};
