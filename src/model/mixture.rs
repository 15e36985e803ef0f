//! Learnable mixture weights for MIX+GAN.
//!
//! Each generator and each discriminator gets a logit. The softmaxes of the
//! two logit vectors are combined by outer product into one weight per
//! (discriminator, generator) pair, flattened discriminator-major so pair
//! `i * n_generators + j` is discriminator `i` against generator `j`.

use tch::{nn, Kind, Tensor};

use super::loss::{GanLosses, EPSILON};

/// Mixture logits over generators and discriminators.
pub struct MixtureWeights {
    generator_logits: Tensor,
    discriminator_logits: Tensor,
    n_generators: usize,
    n_discriminators: usize,
}

impl MixtureWeights {
    /// Creates uniform mixture logits.
    ///
    /// The generator logits live under `generator_path` and the
    /// discriminator logits under `discriminator_path`, so each can be
    /// owned by the variable store whose optimizer should update it.
    pub fn new(
        generator_path: &nn::Path,
        discriminator_path: &nn::Path,
        n_generators: usize,
        n_discriminators: usize,
    ) -> Self {
        let generator_logits = generator_path.var(
            "generator_logits",
            &[n_generators as i64],
            nn::Init::Const(1.0),
        );
        let discriminator_logits = discriminator_path.var(
            "discriminator_logits",
            &[n_discriminators as i64],
            nn::Init::Const(1.0),
        );
        Self {
            generator_logits,
            discriminator_logits,
            n_generators,
            n_discriminators,
        }
    }

    /// Softmax-normalized generator weights, shape `[n_generators]`.
    pub fn generator_weights(&self) -> Tensor {
        self.generator_logits.softmax(-1, Kind::Float)
    }

    /// Softmax-normalized discriminator weights, shape `[n_discriminators]`.
    pub fn discriminator_weights(&self) -> Tensor {
        self.discriminator_logits.softmax(-1, Kind::Float)
    }

    /// Raw generator logits.
    pub fn generator_logits(&self) -> &Tensor {
        &self.generator_logits
    }

    /// Raw discriminator logits.
    pub fn discriminator_logits(&self) -> &Tensor {
        &self.discriminator_logits
    }

    /// One weight per pair, shape `[n_discriminators * n_generators]`.
    pub fn pair_weights(&self) -> Tensor {
        pair_weights(&self.generator_weights(), &self.discriminator_weights())
    }

    /// Entropy penalty discouraging the mixtures from collapsing.
    pub fn entropy_penalty(&self) -> Tensor {
        entropy_penalty(&self.generator_weights(), &self.discriminator_weights())
    }

    /// Weights the pairwise losses and adds the entropy penalty to the
    /// discriminator total.
    ///
    /// Both slices must hold `n_discriminators * n_generators` scalar
    /// losses in pair order.
    pub fn combine(
        &self,
        generator_losses: &[Tensor],
        discriminator_losses: &[Tensor],
    ) -> GanLosses {
        debug_assert_eq!(generator_losses.len(), self.n_pairs());
        debug_assert_eq!(discriminator_losses.len(), self.n_pairs());

        let weights = self.pair_weights();
        let generator = (Tensor::stack(generator_losses, 0) * &weights).sum(Kind::Float);
        let discriminator =
            (Tensor::stack(discriminator_losses, 0) * &weights).sum(Kind::Float);

        GanLosses {
            generator,
            discriminator: discriminator + self.entropy_penalty(),
        }
    }

    /// Number of (discriminator, generator) pairs.
    pub fn n_pairs(&self) -> usize {
        self.n_generators * self.n_discriminators
    }
}

/// Outer product of discriminator and generator weights, flattened
/// discriminator-major.
pub fn pair_weights(generator_weights: &Tensor, discriminator_weights: &Tensor) -> Tensor {
    let discrim = discriminator_weights.reshape([-1, 1]);
    let gen = generator_weights.reshape([1, -1]);
    (discrim * gen).reshape([-1])
}

/// `-(sum(log(w_gen + ε)) / N + sum(log(w_disc + ε)) / M)`.
///
/// This is the negative mean log-weight of each mixture. It is smallest
/// (about `ln N + ln M`) when both mixtures are uniform and grows as either
/// concentrates on a single member. The ε keeps it finite when a softmax
/// weight underflows to zero.
pub fn entropy_penalty(generator_weights: &Tensor, discriminator_weights: &Tensor) -> Tensor {
    let n = generator_weights.numel() as f64;
    let m = discriminator_weights.numel() as f64;
    let gen = (generator_weights + EPSILON).log().sum(Kind::Float) / n;
    let discrim = (discriminator_weights + EPSILON).log().sum(Kind::Float) / m;
    -(gen + discrim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn scalar(t: &Tensor) -> f64 {
        f64::try_from(t).unwrap()
    }

    fn values(t: &Tensor) -> Vec<f64> {
        Vec::<f64>::try_from(t).unwrap()
    }

    fn scalars(vals: &[f32]) -> Vec<Tensor> {
        vals.iter()
            .map(|&v| Tensor::from_slice(&[v]).squeeze())
            .collect()
    }

    #[test]
    fn new_weights_are_uniform() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mixture = MixtureWeights::new(&(&vs.root() / "g"), &(&vs.root() / "d"), 4, 2);
        for w in values(&mixture.generator_weights()) {
            assert!((w - 0.25).abs() < 1e-6);
        }
        for w in values(&mixture.discriminator_weights()) {
            assert!((w - 0.5).abs() < 1e-6);
        }
        assert_eq!(vs.trainable_variables().len(), 2);
    }

    #[test]
    fn pair_weights_sum_to_one() {
        let gen = Tensor::from_slice(&[0.7f32, 0.2, 0.1]);
        let discrim = Tensor::from_slice(&[0.4f32, 0.6]);
        let w = pair_weights(&gen, &discrim);
        assert_eq!(w.size(), vec![6]);
        assert!((scalar(&w.sum(Kind::Float)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pair_weights_are_discriminator_major() {
        let gen = Tensor::from_slice(&[0.75f32, 0.25]);
        let discrim = Tensor::from_slice(&[0.1f32, 0.9]);
        let w = values(&pair_weights(&gen, &discrim));
        let expected = [0.075, 0.025, 0.675, 0.225];
        for (got, want) in w.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn entropy_penalty_smallest_at_uniform() {
        let uniform = Tensor::from_slice(&[0.5f32, 0.5]);
        let penalty = scalar(&entropy_penalty(&uniform, &uniform));
        assert!((penalty - 2.0 * 2f64.ln()).abs() < 1e-5);
        assert!(penalty >= 0.0);
    }

    #[test]
    fn entropy_penalty_grows_as_weights_concentrate() {
        let uniform = Tensor::from_slice(&[0.5f32, 0.5]);
        let mut previous = scalar(&entropy_penalty(&uniform, &uniform));
        for p in [0.6f32, 0.75, 0.9, 0.99] {
            let skewed = Tensor::from_slice(&[p, 1.0 - p]);
            let penalty = scalar(&entropy_penalty(&skewed, &uniform));
            assert!(penalty > previous, "penalty {penalty} at p={p} did not grow");
            previous = penalty;
        }
    }

    #[test]
    fn entropy_penalty_finite_for_saturated_softmax() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mixture = MixtureWeights::new(&(&vs.root() / "g"), &(&vs.root() / "d"), 2, 2);
        tch::no_grad(|| {
            let _ = mixture
                .generator_logits()
                .shallow_clone()
                .copy_(&Tensor::from_slice(&[0f32, -200.0]));
        });
        assert_eq!(values(&mixture.generator_weights())[1], 0.0);

        let penalty = mixture.entropy_penalty();
        assert!(scalar(&penalty).is_finite());
        penalty.backward();
        let grad = values(&mixture.generator_logits().grad());
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn combine_weights_pairwise_losses() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mixture = MixtureWeights::new(&(&vs.root() / "g"), &(&vs.root() / "d"), 2, 2);
        let gen_losses = scalars(&[1.0, 2.0, 3.0, 4.0]);
        let discrim_losses = scalars(&[4.0, 4.0, 4.0, 4.0]);

        let losses = mixture.combine(&gen_losses, &discrim_losses);
        // Uniform 2x2 mixture: every pair weighs 0.25.
        assert!((scalar(&losses.generator) - 2.5).abs() < 1e-5);
        let expected_discrim = 4.0 + 2.0 * 2f64.ln();
        assert!((scalar(&losses.discriminator) - expected_discrim).abs() < 1e-5);
    }

    #[test]
    fn combine_is_differentiable_in_logits() {
        let vs = nn::VarStore::new(Device::Cpu);
        let mixture = MixtureWeights::new(&(&vs.root() / "g"), &(&vs.root() / "d"), 2, 1);
        let gen_losses = scalars(&[1.0, 3.0]);
        let discrim_losses = scalars(&[0.5, 0.5]);
        let losses = mixture.combine(&gen_losses, &discrim_losses);
        losses.generator.backward();
        let grad = values(&mixture.generator_logits().grad());
        // Shifting weight toward the cheaper generator lowers the loss.
        assert!(grad[0] < 0.0);
        assert!(grad[1] > 0.0);
    }
}
