//! Principal component analysis on top of the deflation engine.
//!
//! `fit` centers the observations (rows of an n×d matrix), forms the population covariance
//! `(1/n)·XcᵀXc`, and extracts eigenpairs until the configured fraction of the trace is retained.
//! `transform` projects centered data onto the retained eigenvectors; `inverse_transform` maps the
//! reduced representation back and re-adds the mean.

use faer::Mat;
use log::debug;
use num_traits::Float;

use crate::config::PcaOptions;
use crate::core::traits::{InnerProduct, MatVec};
use crate::eigen::{as_f64, project, Extraction, ExtractionStatus, SpectralExtractor};
use crate::error::PcaError;
use crate::matrix::DenseMatrix;

/// Per-column mean of an n×d observation matrix.
pub fn column_means<T: Float>(data: &Mat<T>) -> Result<Vec<T>, PcaError> {
    let n = data.nrows();
    if n == 0 {
        return Err(PcaError::invalid("data has no rows"));
    }
    let n_t = T::from(n).ok_or_else(|| PcaError::invalid("row count does not fit the scalar type"))?;
    Ok((0..data.ncols())
        .map(|j| (0..n).fold(T::zero(), |acc, i| acc + data[(i, j)]) / n_t)
        .collect())
}

/// Subtract `mean` from every row of `data`.
pub fn center<T: Float>(data: &Mat<T>, mean: &[T]) -> Result<Mat<T>, PcaError> {
    if mean.len() != data.ncols() {
        return Err(PcaError::invalid(format!(
            "mean has {} entries but data has {} columns",
            mean.len(),
            data.ncols()
        )));
    }
    Ok(Mat::from_fn(data.nrows(), data.ncols(), |i, j| data[(i, j)] - mean[j]))
}

/// Population covariance `(1/n)·XᵀX` of an already centered n×d matrix.
pub fn covariance<T: Float>(centered: &Mat<T>) -> Result<Mat<T>, PcaError> {
    let (n, d) = (centered.nrows(), centered.ncols());
    if n == 0 || d == 0 {
        return Err(PcaError::invalid("covariance needs a non-empty data matrix"));
    }
    let n_t = T::from(n).ok_or_else(|| PcaError::invalid("row count does not fit the scalar type"))?;
    let mut cov = Mat::from_fn(d, d, |_, _| T::zero());
    for a in 0..d {
        for b in a..d {
            let s = (0..n).fold(T::zero(), |acc, i| acc + centered[(i, a)] * centered[(i, b)]) / n_t;
            cov[(a, b)] = s;
            cov[(b, a)] = s;
        }
    }
    Ok(cov)
}

/// PCA model: fitted mean and eigen-basis.
pub struct Pca<T> {
    options: PcaOptions<T>,
    mean: Option<Vec<T>>,
    extraction: Option<Extraction<T>>,
}

impl<T> Pca<T>
where
    T: Float + From<f64> + Send + Sync,
    (): InnerProduct<Vec<T>, Scalar = T>,
{
    pub fn new(options: PcaOptions<T>) -> Self {
        Pca {
            options,
            mean: None,
            extraction: None,
        }
    }

    pub fn fit(&mut self, data: &Mat<T>) -> Result<(), PcaError> {
        // fraction is checked before any matrix work
        if !(self.options.target_fraction > T::zero() && self.options.target_fraction <= T::one()) {
            return Err(PcaError::invalid(format!(
                "target fraction must lie in (0, 1], got {}",
                as_f64(self.options.target_fraction)
            )));
        }
        if !data.all_finite() {
            return Err(PcaError::invalid("data contains NaN or infinite entries"));
        }

        let mean = if self.options.center {
            column_means(data)?
        } else {
            vec![T::zero(); data.ncols()]
        };
        let centered = center(data, &mean)?;
        let cov = covariance(&centered)?;

        let mut extractor = SpectralExtractor::new(&cov, &self.options.extract)?;
        let extraction = extractor.extract(self.options.target_fraction)?;
        debug!(
            "pca fit: {} samples, {} features, kept {} components ({:.4} of variance)",
            data.nrows(),
            data.ncols(),
            extraction.n_components(),
            as_f64(extraction.captured_fraction())
        );

        self.mean = Some(mean);
        self.extraction = Some(extraction);
        Ok(())
    }

    /// Project `data` (n×d) onto the retained components, giving n×k.
    pub fn transform(&self, data: &Mat<T>) -> Result<Mat<T>, PcaError> {
        match (&self.mean, &self.extraction) {
            (Some(mean), Some(ex)) => project(&center(data, mean)?, &ex.basis),
            _ => Err(PcaError::NotFitted),
        }
    }

    pub fn fit_transform(&mut self, data: &Mat<T>) -> Result<Mat<T>, PcaError> {
        self.fit(data)?;
        self.transform(data)
    }

    /// Map a reduced n×k representation back to n×d: `Y·Vᵀ + mean`.
    pub fn inverse_transform(&self, projected: &Mat<T>) -> Result<Mat<T>, PcaError> {
        let (Some(mean), Some(ex)) = (&self.mean, &self.extraction) else {
            return Err(PcaError::NotFitted);
        };
        let k = ex.basis.ncols();
        if projected.ncols() != k {
            return Err(PcaError::invalid(format!(
                "projection has {} columns but the model keeps {} components",
                projected.ncols(),
                k
            )));
        }
        let d = ex.basis.nrows();
        let mut out = Mat::from_fn(projected.nrows(), d, |_, _| T::zero());
        let mut y = vec![T::zero(); k];
        let mut row = vec![T::zero(); d];
        for i in 0..projected.nrows() {
            for (j, yj) in y.iter_mut().enumerate() {
                *yj = projected[(i, j)];
            }
            // V · yᵢ
            ex.basis.matvec(&y, &mut row);
            for (j, &r) in row.iter().enumerate() {
                out[(i, j)] = r + mean[j];
            }
        }
        Ok(out)
    }

    pub fn components(&self) -> Option<&Mat<T>> {
        self.extraction.as_ref().map(|ex| &ex.basis)
    }

    pub fn mean(&self) -> Option<&[T]> {
        self.mean.as_deref()
    }

    pub fn eigenvalues(&self) -> Option<Vec<T>> {
        self.extraction.as_ref().map(Extraction::eigenvalues)
    }

    pub fn explained_variance_ratio(&self) -> Option<Vec<T>> {
        self.extraction.as_ref().map(Extraction::explained_variance_ratio)
    }

    pub fn total_variance(&self) -> Option<T> {
        self.extraction.as_ref().map(|ex| ex.total_variance)
    }

    pub fn status(&self) -> Option<ExtractionStatus> {
        self.extraction.as_ref().map(|ex| ex.status)
    }

    pub fn extraction(&self) -> Option<&Extraction<T>> {
        self.extraction.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn means_and_centering() {
        let x: Mat<f64> = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 6.0]]);
        let mean = column_means(&x).unwrap();
        assert_eq!(mean, vec![2.0, 4.0]);
        let c = center(&x, &mean).unwrap();
        assert_eq!(c[(0, 0)], -1.0);
        assert_eq!(c[(1, 1)], 2.0);
    }

    #[test]
    fn covariance_is_population_scaled() {
        let c: Mat<f64> = DenseMatrix::from_rows(&[vec![-1.0, -2.0], vec![1.0, 2.0]]);
        let cov = covariance(&c).unwrap();
        assert_eq!(cov[(0, 0)], 1.0);
        assert_eq!(cov[(0, 1)], 2.0);
        assert_eq!(cov[(1, 0)], 2.0);
        assert_eq!(cov[(1, 1)], 4.0);
    }

    #[test]
    fn transform_before_fit_fails() {
        let pca = Pca::<f64>::new(PcaOptions::default());
        let x = Mat::from_fn(3, 2, |i, j| (i + j) as f64);
        assert_eq!(pca.transform(&x).unwrap_err(), PcaError::NotFitted);
        assert_eq!(pca.inverse_transform(&x).unwrap_err(), PcaError::NotFitted);
    }

    #[test]
    fn collinear_data_keeps_one_component() {
        // every row lies on the line y = 2x
        let x: Mat<f64> = DenseMatrix::from_rows(&[
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 6.0],
            vec![4.0, 8.0],
        ]);
        let mut pca = Pca::new(PcaOptions::new(0.95));
        let y = pca.fit_transform(&x).unwrap();
        assert_eq!(y.ncols(), 1);
        let v = pca.components().unwrap();
        let s = 5.0f64.sqrt();
        assert!((v[(0, 0)].abs() - 1.0 / s).abs() < 1e-6);
        assert!((v[(1, 0)].abs() - 2.0 / s).abs() < 1e-6);
        let ratio = pca.explained_variance_ratio().unwrap();
        assert!((ratio[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uncentered_fit_projects_raw_rows() {
        let x: Mat<f64> = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]);
        let mut pca = Pca::new(PcaOptions::new(0.95).center(false));
        let y = pca.fit_transform(&x).unwrap();
        assert_eq!(pca.mean().unwrap(), &[0.0, 0.0]);
        // second moment (1/2)·XᵀX has λ = 12.5 along (1, 2)/√5
        assert!((pca.eigenvalues().unwrap()[0] - 12.5).abs() < 1e-6);
        let s = 5.0f64.sqrt();
        assert!((y[(0, 0)].abs() - s).abs() < 1e-6);
        assert!((y[(1, 0)].abs() - 2.0 * s).abs() < 1e-6);
    }

    #[test]
    fn bad_fraction_is_rejected_before_fitting() {
        let x = Mat::from_fn(3, 2, |i, j| (i * j) as f64);
        let mut pca = Pca::new(PcaOptions::new(1.5));
        assert!(matches!(pca.fit(&x), Err(PcaError::InvalidArgument(_))));
        assert!(pca.components().is_none());
    }
}
