use faer::Mat;
use powerpca::{Pca, PcaOptions};
use rand::Rng;

fn main() {
    env_logger::init();
    let n = 100;
    // five features driven by two latent factors plus a little noise
    let mut rng = rand::thread_rng();
    let noise: Vec<f64> = (0..n * 5).map(|_| 0.05 * (rng.r#gen::<f64>() - 0.5)).collect();
    let data = Mat::from_fn(n, 5, |i, j| {
        let t = i as f64 / n as f64;
        let (f1, f2) = ((6.0 * t).sin(), (t - 0.5) * 3.0);
        let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
        (j as f64 + 1.0) * f1 + sign * f2 + noise[j * n + i]
    });

    let mut pca = Pca::new(PcaOptions::new(0.95));
    let reduced = pca.fit_transform(&data).unwrap();
    println!(
        "kept {} of {} features, eigenvalues = {:?}, ratios = {:?}, status = {:?}",
        reduced.ncols(),
        data.ncols(),
        pca.eigenvalues().unwrap(),
        pca.explained_variance_ratio().unwrap(),
        pca.status().unwrap()
    );
}
