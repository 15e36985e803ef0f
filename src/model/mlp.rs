//! Fully connected generator and discriminator.
//!
//! A small ready-made architecture for vector-valued data. Conditional
//! inputs, if any, are concatenated to the network input.

use tch::{nn, nn::Module, Tensor};

use super::trait_::{Discriminator, GanArchitecture, Generator};
use crate::config::GanConfig;

/// MLP generator: `[noise ‖ cond] → hidden… → data_dim` with ReLU
/// activations and a linear output.
pub struct MlpGenerator {
    net: nn::Sequential,
}

impl MlpGenerator {
    /// Creates a new generator.
    pub fn new(path: &nn::Path, input_dim: i64, hidden: &[i64], data_dim: i64) -> Self {
        Self {
            net: mlp(path, input_dim, hidden, data_dim),
        }
    }
}

impl Generator for MlpGenerator {
    fn generate(&self, noise: &Tensor, conditional: &[Tensor], _train: bool) -> Vec<Tensor> {
        let input = concat_inputs(noise, conditional);
        vec![self.net.forward(&input)]
    }
}

/// MLP discriminator: `[data ‖ cond] → hidden… → 1` with ReLU activations
/// and a sigmoid output.
pub struct MlpDiscriminator {
    net: nn::Sequential,
}

impl MlpDiscriminator {
    /// Creates a new discriminator.
    pub fn new(path: &nn::Path, input_dim: i64, hidden: &[i64]) -> Self {
        Self {
            net: mlp(path, input_dim, hidden, 1),
        }
    }
}

impl Discriminator for MlpDiscriminator {
    fn discriminate(&self, data: &[Tensor], conditional: &[Tensor], _train: bool) -> Tensor {
        let mut inputs: Vec<&Tensor> = data.iter().collect();
        inputs.extend(conditional.iter());
        let input = Tensor::cat(&inputs, 1);
        self.net.forward(&input).sigmoid().squeeze_dim(-1)
    }
}

/// Architecture building [`MlpGenerator`]s and [`MlpDiscriminator`]s for
/// flat data vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct MlpArchitecture {
    /// Length of the noise vector.
    pub noise_dim: i64,
    /// Length of a data sample.
    pub data_dim: i64,
    /// Length of the conditional vector; 0 for an unconditional GAN.
    pub conditional_dim: i64,
    /// Hidden layer widths, shared by generators and discriminators.
    pub hidden: Vec<i64>,
}

impl MlpArchitecture {
    /// Creates an unconditional architecture with two hidden layers of 64.
    pub fn new(noise_dim: i64, data_dim: i64) -> Self {
        Self {
            noise_dim,
            data_dim,
            conditional_dim: 0,
            hidden: vec![64, 64],
        }
    }

    /// Returns the [`GanConfig`] whose shapes match this architecture.
    pub fn config(&self, n_generators: usize, n_discriminators: usize) -> GanConfig {
        let conditional_shapes = if self.conditional_dim > 0 {
            vec![vec![self.conditional_dim]]
        } else {
            Vec::new()
        };
        GanConfig::new(vec![self.noise_dim], vec![vec![self.data_dim]])
            .with_conditional_shapes(conditional_shapes)
            .with_mixture(n_generators, n_discriminators)
    }
}

impl GanArchitecture for MlpArchitecture {
    fn create_generator(&self, path: &nn::Path, _config: &GanConfig) -> Box<dyn Generator> {
        Box::new(MlpGenerator::new(
            path,
            self.noise_dim + self.conditional_dim,
            &self.hidden,
            self.data_dim,
        ))
    }

    fn create_discriminator(
        &self,
        path: &nn::Path,
        _config: &GanConfig,
    ) -> Box<dyn Discriminator> {
        Box::new(MlpDiscriminator::new(
            path,
            self.data_dim + self.conditional_dim,
            &self.hidden,
        ))
    }
}

fn mlp(path: &nn::Path, input_dim: i64, hidden: &[i64], output_dim: i64) -> nn::Sequential {
    let mut net = nn::seq();
    let mut dim = input_dim;
    for (k, &width) in hidden.iter().enumerate() {
        net = net
            .add(nn::linear(path / format!("l{k}"), dim, width, Default::default()))
            .add_fn(|x| x.relu());
        dim = width;
    }
    net.add(nn::linear(path / "out", dim, output_dim, Default::default()))
}

fn concat_inputs(first: &Tensor, rest: &[Tensor]) -> Tensor {
    if rest.is_empty() {
        return first.shallow_clone();
    }
    let mut inputs = vec![first];
    inputs.extend(rest.iter());
    Tensor::cat(&inputs, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn generator_forward_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let gen = MlpGenerator::new(&vs.root(), 8, &[16], 3);
        let noise = Tensor::randn([5, 8], (Kind::Float, Device::Cpu));
        let out = gen.generate(&noise, &[], true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].size(), vec![5, 3]);
    }

    #[test]
    fn discriminator_outputs_probabilities() {
        let vs = nn::VarStore::new(Device::Cpu);
        let disc = MlpDiscriminator::new(&vs.root(), 3, &[16, 8]);
        let data = Tensor::randn([6, 3], (Kind::Float, Device::Cpu));
        let out = disc.discriminate(&[data], &[], true);
        assert_eq!(out.size(), vec![6]);
        let min = f64::try_from(&out.min()).unwrap();
        let max = f64::try_from(&out.max()).unwrap();
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn conditional_inputs_are_concatenated() {
        let arch = MlpArchitecture {
            conditional_dim: 2,
            ..MlpArchitecture::new(4, 3)
        };
        let config = arch.config(1, 1);
        let vs = nn::VarStore::new(Device::Cpu);
        let gen = arch.create_generator(&(&vs.root() / "g"), &config);
        let disc = arch.create_discriminator(&(&vs.root() / "d"), &config);

        let noise = Tensor::randn([2, 4], (Kind::Float, Device::Cpu));
        let cond = Tensor::ones([2, 2], (Kind::Float, Device::Cpu));
        let generated = gen.generate(&noise, std::slice::from_ref(&cond), false);
        assert_eq!(generated[0].size(), vec![2, 3]);

        let probs = disc.discriminate(&generated, std::slice::from_ref(&cond), false);
        assert_eq!(probs.size(), vec![2]);
    }

    #[test]
    fn config_matches_dimensions() {
        let arch = MlpArchitecture {
            conditional_dim: 2,
            ..MlpArchitecture::new(4, 3)
        };
        let cfg = arch.config(2, 3);
        assert_eq!(cfg.noise_shape, vec![4]);
        assert_eq!(cfg.data_shapes, vec![vec![3]]);
        assert_eq!(cfg.conditional_shapes, vec![vec![2]]);
        assert_eq!(cfg.n_pairs(), 6);

        assert!(MlpArchitecture::new(4, 3).config(1, 1).conditional_shapes.is_empty());
    }
}
