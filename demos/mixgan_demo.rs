//! MIX+GAN demo: two generators learning a two-cluster distribution.
//!
//! Real samples come from two Gaussian clusters in the plane. Two
//! generators and two discriminators are trained together; afterwards the
//! demo prints where each generator's samples land and the learned
//! mixture weights.
//!
//! Run (requires libtorch):
//! ```sh
//! RUST_LOG=info cargo run --example mixgan_demo
//! ```

use mixgan::{
    Batch, FitOptions, GanModel, GanTrainer, MlpArchitecture, SampleRequest, TrainingConfig,
};
use tch::{Device, Kind, Tensor};
use tracing_subscriber::EnvFilter;

const BATCH_SIZE: i64 = 64;

/// Half the batch around (-2, -2), half around (2, 2).
fn two_clusters(n: i64) -> Tensor {
    let half = n / 2;
    let opts = (Kind::Float, Device::Cpu);
    let left = Tensor::randn([half, 2], opts) * 0.3 - 2.0;
    let right = Tensor::randn([n - half, 2], opts) * 0.3 + 2.0;
    Tensor::cat(&[left, right], 0)
}

fn main() -> mixgan::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== MIX+GAN Demo ===\n");

    let arch = MlpArchitecture {
        hidden: vec![32, 32],
        ..MlpArchitecture::new(4, 2)
    };
    let config = arch.config(2, 2);
    println!("Model:");
    println!("  Generators:     {}", config.n_generators);
    println!("  Discriminators: {}", config.n_discriminators);
    println!("  Noise shape:    {:?}", config.noise_shape);
    println!();

    tch::manual_seed(42);
    let model = GanModel::new(arch, config, Device::Cpu)?;
    let train_config = TrainingConfig {
        learning_rate: 2e-3,
        beta1: 0.5,
        seed: Some(42),
        ..TrainingConfig::default()
    };
    let mut trainer = GanTrainer::new(model, train_config)?;

    let batches = (0..3000).map(|_| Batch::new(vec![two_clusters(BATCH_SIZE)]));
    let options = FitOptions {
        generator_steps: 1.0,
        checkpoint_interval: 500,
        ..FitOptions::default()
    };
    let report = trainer.fit(batches, &options)?;
    println!("{report}\n");

    let model = trainer.model();
    for index in 0..model.n_generators() {
        let samples = model.predict_generator(SampleRequest::new(512).with_generator(index))?;
        let mean = samples[0].mean_dim([0i64].as_slice(), false, Kind::Float);
        let mean = Vec::<f64>::try_from(&mean)?;
        println!(
            "  Generator {index}: sample mean = ({:+.2}, {:+.2})",
            mean[0], mean[1]
        );
    }

    if let Some(mixture) = model.mixture() {
        let gen = Vec::<f64>::try_from(&mixture.generator_weights())?;
        let discrim = Vec::<f64>::try_from(&mixture.discriminator_weights())?;
        println!("  Generator weights:     {gen:.3?}");
        println!("  Discriminator weights: {discrim:.3?}");
    }

    Ok(())
}
