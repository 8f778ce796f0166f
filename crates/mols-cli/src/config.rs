//! TOML configuration deserialisation for design jobs.

use serde::Deserialize;

use mols_core::types::{DesignParams, GridParams};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub design: DesignConfig,
    #[serde(default)]
    pub energy: EnergySpec,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Grid and spline parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct DesignConfig {
    /// Interpolator support width J.
    pub support: usize,
    /// Image size N.
    pub image_size: usize,
    /// Oversampled image size K.
    pub oversampled_size: usize,
    /// Oversampling factor of the interpolator (odd).
    pub oversampling: usize,
    #[serde(default = "default_order")]
    pub order: usize,
    /// Seed spline degree (default: J − 1).
    #[serde(default)]
    pub degree: Option<usize>,
    /// Cap on optimisation rounds (default and maximum: 100).
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

fn default_order() -> usize {
    2
}

/// Energy prior H: uniform, an explicit list, or a Gaussian profile.
///
/// Each form rejects keys it does not know, so a misspelt key is an error
/// rather than a silent fallback to the uniform prior.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnergySpec {
    Values(EnergyValues),
    Gaussian(GaussianEnergy),
    Uniform(UniformEnergy),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergyValues {
    /// One value per image frequency.
    pub values: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaussianEnergy {
    /// Standard deviation in frequency bins, centred on DC.
    pub gaussian_width: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniformEnergy {}

impl Default for EnergySpec {
    fn default() -> Self {
        EnergySpec::Uniform(UniformEnergy::default())
    }
}

impl EnergySpec {
    /// Materialise the prior over `n` frequencies; `None` means uniform.
    pub fn resolve(&self, n: usize) -> Option<Vec<f64>> {
        match self {
            EnergySpec::Uniform(_) => None,
            EnergySpec::Values(prior) => Some(prior.values.clone()),
            EnergySpec::Gaussian(prior) => {
                let centre = n as f64 / 2.0;
                Some(
                    (0..n)
                        .map(|i| {
                            let u = (i as f64 - centre) / prior.gaussian_width;
                            (-0.5 * u * u).exp()
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save interpolator, kernel and prefilter as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save the full result as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Convert the job into core design parameters.
    pub fn design_params(&self) -> DesignParams {
        let grid = GridParams {
            support: self.design.support,
            image_size: self.design.image_size,
            oversampled_size: self.design.oversampled_size,
            oversampling: self.design.oversampling,
        };
        DesignParams {
            grid,
            order: self.design.order,
            degree: self.design.degree,
            energy: self.energy.resolve(grid.image_size),
        }
    }
}

/// Example job printed by `mols-cli example`.
pub const EXAMPLE_JOB: &str = r#"[design]
support = 6
image_size = 128
oversampled_size = 130
oversampling = 3
order = 2
# degree = 5
# max_rounds = 100

[energy]
# values = [ ... ]      # explicit prior, one value per image frequency
# gaussian_width = 32.0 # or a Gaussian profile centred on DC

[output]
directory = "./output"
save_csv = true
save_json = true
"#;

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    config.design_params().validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_job_parses() {
        let job = parse_config(EXAMPLE_JOB).unwrap();
        let params = job.design_params();
        assert_eq!(params.grid.support, 6);
        assert_eq!(params.order, 2);
        assert!(params.energy.is_none());
        assert!(job.output.save_json);
    }

    #[test]
    fn test_minimal_job_uses_defaults() {
        let job = parse_config(
            "[design]\nsupport = 4\nimage_size = 32\noversampled_size = 40\noversampling = 5\n",
        )
        .unwrap();
        assert_eq!(job.design.order, 2);
        assert_eq!(job.design.degree, None);
        assert_eq!(job.output.directory, "./output");
        assert!(job.output.save_csv);
        assert!(!job.output.save_json);
    }

    #[test]
    fn test_gaussian_energy_peaks_at_centre() {
        let job = parse_config(
            "[design]\nsupport = 4\nimage_size = 8\noversampled_size = 10\noversampling = 3\n\
             [energy]\ngaussian_width = 2.0\n",
        )
        .unwrap();
        let h = job.design_params().energy.unwrap();
        assert_eq!(h.len(), 8);
        assert_eq!(h[4], 1.0);
        assert!(h[0] < h[2]);
    }

    #[test]
    fn test_even_oversampling_fails_validation() {
        let err = parse_config(
            "[design]\nsupport = 4\nimage_size = 8\noversampled_size = 10\noversampling = 2\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_misspelt_energy_key_is_rejected() {
        let result = parse_config(
            "[design]\nsupport = 4\nimage_size = 8\noversampled_size = 10\noversampling = 3\n\
             [energy]\ngaussain_width = 8.0\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_energy_values() {
        let job = parse_config(
            "[design]\nsupport = 4\nimage_size = 4\noversampled_size = 6\noversampling = 3\n\
             [energy]\nvalues = [1.0, 2.0, 2.0, 1.0]\n",
        )
        .unwrap();
        assert_eq!(job.design_params().energy, Some(vec![1.0, 2.0, 2.0, 1.0]));
    }

    #[test]
    fn test_empty_energy_table_is_uniform() {
        let job = parse_config(
            "[design]\nsupport = 4\nimage_size = 8\noversampled_size = 10\noversampling = 3\n\
             [energy]\n",
        )
        .unwrap();
        assert!(job.design_params().energy.is_none());
    }
}
