//! mixgan - adversarial training with mixtures of generators and
//! discriminators.
//!
//! A framework for training Generative Adversarial Networks on top of
//! `tch`, including the MIX+GAN variant where several generators and
//! discriminators are combined through learned mixture weights.
//!
//! Users describe their networks by implementing [`GanArchitecture`],
//! build a [`GanModel`], train it with a [`GanTrainer`], and draw samples
//! with [`GanModel::predict_generator`].

pub mod config;
pub mod error;
pub mod model;
pub mod training;

pub use config::GanConfig;
pub use error::{GanError, Result};
pub use model::{
    Batch, Discriminator, GanArchitecture, GanLosses, GanModel, Generator, MixtureWeights,
    MlpArchitecture, SampleRequest,
};
pub use training::{
    Checkpoint, CheckpointManager, FitOptions, GanTrainer, TrainingConfig, TrainingReport,
};
