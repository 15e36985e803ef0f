//! Shape and population configuration for a GAN.

use crate::error::{GanError, Result};

/// Describes the inputs of a GAN and how many sub-models it holds.
///
/// All shapes omit the leading batch dimension.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GanConfig {
    // --- Inputs ---
    /// Shape of one noise sample fed to the generators.
    pub noise_shape: Vec<i64>,
    /// Shapes of the training data inputs. Generators must produce one
    /// output per entry, with the same shape.
    pub data_shapes: Vec<Vec<i64>>,
    /// Shapes of the conditional inputs shared by generators and
    /// discriminators. Empty for an unconditional GAN.
    pub conditional_shapes: Vec<Vec<i64>>,

    // --- MIX+GAN ---
    /// Number of generators.
    pub n_generators: usize,
    /// Number of discriminators.
    pub n_discriminators: usize,
}

impl GanConfig {
    /// Creates a config for a single-generator, single-discriminator GAN
    /// without conditional inputs.
    pub fn new(noise_shape: Vec<i64>, data_shapes: Vec<Vec<i64>>) -> Self {
        Self {
            noise_shape,
            data_shapes,
            conditional_shapes: Vec::new(),
            n_generators: 1,
            n_discriminators: 1,
        }
    }

    /// Sets the conditional input shapes.
    pub fn with_conditional_shapes(mut self, shapes: Vec<Vec<i64>>) -> Self {
        self.conditional_shapes = shapes;
        self
    }

    /// Sets the number of generators and discriminators.
    pub fn with_mixture(mut self, n_generators: usize, n_discriminators: usize) -> Self {
        self.n_generators = n_generators;
        self.n_discriminators = n_discriminators;
        self
    }

    /// True when losses are combined through learned mixture weights.
    pub fn is_mixture(&self) -> bool {
        self.n_generators > 1 || self.n_discriminators > 1
    }

    /// Number of (discriminator, generator) pairs.
    pub fn n_pairs(&self) -> usize {
        self.n_generators * self.n_discriminators
    }

    /// Checks that the config describes a buildable GAN.
    pub fn validate(&self) -> Result<()> {
        if self.n_generators == 0 {
            return Err(GanError::InvalidConfig(
                "n_generators must be at least 1".to_string(),
            ));
        }
        if self.n_discriminators == 0 {
            return Err(GanError::InvalidConfig(
                "n_discriminators must be at least 1".to_string(),
            ));
        }
        if self.data_shapes.is_empty() {
            return Err(GanError::InvalidConfig(
                "at least one data input shape is required".to_string(),
            ));
        }
        check_dims("noise shape", &self.noise_shape)?;
        for shape in &self.data_shapes {
            check_dims("data shape", shape)?;
        }
        for shape in &self.conditional_shapes {
            check_dims("conditional shape", shape)?;
        }
        Ok(())
    }
}

fn check_dims(what: &str, shape: &[i64]) -> Result<()> {
    if shape.is_empty() {
        return Err(GanError::InvalidConfig(format!("{what} must not be empty")));
    }
    if let Some(d) = shape.iter().find(|&&d| d <= 0) {
        return Err(GanError::InvalidConfig(format!(
            "{what} {shape:?} has non-positive dimension {d}"
        )));
    }
    Ok(())
}
