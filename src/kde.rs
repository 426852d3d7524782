//! Kernel-density weighting front-end.
//!
//! Collaborator of the transform core: supplies the pdf/cdf a sample
//! generator can use to weight or seed tree construction. The core never
//! consumes this module directly; it only ever sees the discretized
//! coordinates such a generator emits.
//!
//! Bandwidths follow the plug-in rule `sigma * (3n/4)^(-1/5)` per
//! dimension, with a fallback to 1.0 for single-point samples.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// KDE configuration/validation errors, raised at configuration time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KdeError {
    #[error("unsupported kernel code {code} (valid: 0..=4)")]
    UnsupportedKernel { code: usize },

    #[error("sample point {point} has {got} coordinates, expected {expected}")]
    DimensionMismatch {
        point: usize,
        expected: usize,
        got: usize,
    },

    #[error("a density estimate needs at least one sample point")]
    EmptySample,
}

/// Smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Kernel {
    #[default]
    Gaussian,
    Epanechnikov,
    Uniform,
    Biweight,
    Triweight,
}

impl TryFrom<usize> for Kernel {
    type Error = KdeError;

    /// Numeric kernel codes, for configuration formats that store kernels
    /// as integers.
    fn try_from(code: usize) -> Result<Self, KdeError> {
        match code {
            0 => Ok(Kernel::Gaussian),
            1 => Ok(Kernel::Epanechnikov),
            2 => Ok(Kernel::Uniform),
            3 => Ok(Kernel::Biweight),
            4 => Ok(Kernel::Triweight),
            code => Err(KdeError::UnsupportedKernel { code }),
        }
    }
}

impl Kernel {
    /// One-dimensional kernel density at `x` for a kernel centred on `mu`
    /// with bandwidth `sigma`.
    pub fn pdf(self, x: f64, mu: f64, sigma: f64) -> f64 {
        let z = (x - mu) / sigma;
        match self {
            Kernel::Gaussian => {
                (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
            }
            Kernel::Epanechnikov => {
                if z.abs() > 1.0 {
                    0.0
                } else {
                    0.75 * (1.0 - z * z) / sigma
                }
            }
            Kernel::Uniform => {
                if x < mu - 0.5 * sigma || x > mu + 0.5 * sigma {
                    0.0
                } else {
                    1.0 / sigma
                }
            }
            Kernel::Biweight => {
                if z.abs() > 1.0 {
                    0.0
                } else {
                    let t = 1.0 - z * z;
                    0.9375 * t * t
                }
            }
            Kernel::Triweight => {
                if z.abs() > 1.0 {
                    0.0
                } else {
                    let t = 1.0 - z * z;
                    1.09375 * t * t * t
                }
            }
        }
    }

    /// One-dimensional kernel CDF at `x`.
    pub fn cdf(self, x: f64, mu: f64, sigma: f64) -> f64 {
        let z = (x - mu) / sigma;
        match self {
            Kernel::Gaussian => gaussian_cdf(x, mu, sigma),
            Kernel::Epanechnikov => clamped01(z, |z| 0.25 * (2.0 + 3.0 * z - z.powi(3))),
            Kernel::Uniform => {
                if x < mu - 0.5 * sigma {
                    0.0
                } else if x > mu + 0.5 * sigma {
                    1.0
                } else {
                    (x - mu) / sigma + 0.5
                }
            }
            Kernel::Biweight => clamped01(z, |z| {
                0.9375 * (z - 2.0 * z.powi(3) / 3.0 + 0.2 * z.powi(5)) + 0.5
            }),
            Kernel::Triweight => clamped01(z, |z| {
                1.09375 * (z - z.powi(3) + 0.6 * z.powi(5) - z.powi(7) / 7.0) + 0.5
            }),
        }
    }
}

fn clamped01(z: f64, body: impl Fn(f64) -> f64) -> f64 {
    if z < -1.0 {
        0.0
    } else if z > 1.0 {
        1.0
    } else {
        body(z)
    }
}

/// Normal CDF via the Abramowitz-Stegun polynomial approximation.
fn gaussian_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * (x - mu).abs() / sigma);
    let y = t * (0.319381530
        + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));
    let tail = Kernel::Gaussian.pdf(x, mu, sigma) * y * sigma;
    if x >= mu {
        1.0 - tail
    } else {
        tail
    }
}

/// A product-kernel density estimate over a continuous sample.
#[derive(Debug, Clone)]
pub struct Kde {
    kernel: Kernel,
    dimension: usize,
    bandwidth: Vec<f64>,
    sample: Vec<Vec<f64>>,
}

impl Kde {
    /// Build an estimate over `sample`; bandwidths are computed per
    /// dimension. All validation happens here, not at first evaluation.
    pub fn new(kernel: Kernel, dimension: usize, sample: Vec<Vec<f64>>) -> Result<Self, KdeError> {
        if sample.is_empty() {
            return Err(KdeError::EmptySample);
        }
        for (point, p) in sample.iter().enumerate() {
            if p.len() != dimension {
                return Err(KdeError::DimensionMismatch {
                    point,
                    expected: dimension,
                    got: p.len(),
                });
            }
        }

        let bandwidth = compute_bandwidth(&sample, dimension);
        Ok(Self {
            kernel,
            dimension,
            bandwidth,
            sample,
        })
    }

    /// Number of dimensions.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bandwidth used for `dim`.
    #[inline]
    pub fn bandwidth(&self, dim: usize) -> f64 {
        self.bandwidth[dim]
    }

    /// Estimated density at `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x.len()` differs from the configured dimension.
    pub fn pdf(&self, x: &[f64]) -> f64 {
        assert_eq!(x.len(), self.dimension, "pdf input dimension");
        let mut res = 0.0;
        for p in &self.sample {
            let mut t = 1.0;
            for dim in 0..self.dimension {
                t *= self.kernel.pdf(x[dim], p[dim], self.bandwidth[dim]);
            }
            res += t;
        }
        res / self.sample.len() as f64
    }

    /// Estimated cumulative distribution at `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x.len()` differs from the configured dimension.
    pub fn cdf(&self, x: &[f64]) -> f64 {
        assert_eq!(x.len(), self.dimension, "cdf input dimension");
        let mut res = 0.0;
        for p in &self.sample {
            let mut t = 1.0;
            for dim in 0..self.dimension {
                t *= self.kernel.cdf(x[dim], p[dim], self.bandwidth[dim]);
            }
            res += t;
        }
        res / self.sample.len() as f64
    }
}

fn compute_bandwidth(sample: &[Vec<f64>], dimension: usize) -> Vec<f64> {
    let n = sample.len() as f64;
    if sample.len() == 1 {
        return vec![1.0; dimension];
    }

    (0..dimension)
        .map(|dim| {
            let sum: f64 = sample.iter().map(|p| p[dim]).sum();
            let ssum: f64 = sample.iter().map(|p| p[dim] * p[dim]).sum();
            let mean = sum / n;
            let sigma = (ssum / n - mean * mean).max(0.0).sqrt();
            sigma * (3.0 * n / 4.0).powf(-0.2)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kernel_codes_round_trip() {
        assert_eq!(Kernel::try_from(0).unwrap(), Kernel::Gaussian);
        assert_eq!(Kernel::try_from(4).unwrap(), Kernel::Triweight);
        assert!(matches!(
            Kernel::try_from(5),
            Err(KdeError::UnsupportedKernel { code: 5 })
        ));
    }

    #[test]
    fn kernel_pdfs_peak_at_centre() {
        for kernel in [
            Kernel::Gaussian,
            Kernel::Epanechnikov,
            Kernel::Uniform,
            Kernel::Biweight,
            Kernel::Triweight,
        ] {
            let at_centre = kernel.pdf(0.0, 0.0, 1.0);
            assert!(at_centre > 0.0, "{kernel:?}");
            assert!(kernel.pdf(0.9, 0.0, 1.0) <= at_centre, "{kernel:?}");
            assert_eq!(kernel.pdf(5.0, 0.0, 1.0), 0.0, "{kernel:?} has bounded support");
        }
        // Gaussian support is unbounded.
        assert!(Kernel::Gaussian.pdf(5.0, 0.0, 1.0) > 0.0);
    }

    #[test]
    fn kernel_cdfs_are_monotone_from_zero_to_one() {
        for kernel in [
            Kernel::Gaussian,
            Kernel::Epanechnikov,
            Kernel::Uniform,
            Kernel::Biweight,
            Kernel::Triweight,
        ] {
            assert!(kernel.cdf(-6.0, 0.0, 1.0) < 1e-6, "{kernel:?}");
            assert!(kernel.cdf(6.0, 0.0, 1.0) > 1.0 - 1e-6, "{kernel:?}");
            assert_relative_eq!(kernel.cdf(0.0, 0.0, 1.0), 0.5, epsilon = 1e-3);

            let mut prev = 0.0;
            for i in -60..=60 {
                let c = kernel.cdf(i as f64 / 10.0, 0.0, 1.0);
                assert!(c >= prev - 1e-12, "{kernel:?} at {i}");
                prev = c;
            }
        }
    }

    #[test]
    fn bandwidth_follows_plugin_rule() {
        let sample = vec![vec![0.0], vec![2.0], vec![4.0], vec![6.0]];
        let kde = Kde::new(Kernel::Gaussian, 1, sample).unwrap();

        // mean 3, variance 5; bw = sqrt(5) * 3^(-1/5).
        let expected = 5.0f64.sqrt() * 3.0f64.powf(-0.2);
        assert_relative_eq!(kde.bandwidth(0), expected, epsilon = 1e-12);
    }

    #[test]
    fn single_point_sample_gets_unit_bandwidth() {
        let kde = Kde::new(Kernel::Gaussian, 2, vec![vec![1.0, 2.0]]).unwrap();
        assert_eq!(kde.bandwidth(0), 1.0);
        assert_eq!(kde.bandwidth(1), 1.0);
    }

    #[test]
    fn pdf_integrates_to_roughly_one() {
        let sample = vec![vec![-1.0], vec![0.5], vec![1.0]];
        let kde = Kde::new(Kernel::Epanechnikov, 1, sample).unwrap();

        let (mut mass, h) = (0.0, 0.01);
        let mut x = -5.0;
        while x < 5.0 {
            mass += kde.pdf(&[x]) * h;
            x += h;
        }
        assert_relative_eq!(mass, 1.0, epsilon = 1e-2);
    }

    #[test]
    fn rejects_malformed_configuration() {
        assert!(matches!(
            Kde::new(Kernel::Gaussian, 1, vec![]),
            Err(KdeError::EmptySample)
        ));
        assert!(matches!(
            Kde::new(Kernel::Gaussian, 2, vec![vec![0.0, 1.0], vec![3.0]]),
            Err(KdeError::DimensionMismatch {
                point: 1,
                expected: 2,
                got: 1
            })
        ));
    }
}
