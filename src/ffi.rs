use crate::{minimize, XnesConfigBuilder};

/// Return a simple version number (major<<16 | minor<<8 | patch).
#[no_mangle]
pub extern "C" fn fastxnes_version() -> u32 {
    const VER: &str = env!("CARGO_PKG_VERSION");
    let mut parts = VER.split('.').filter_map(|p| p.parse::<u32>().ok());
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    (major << 16) | (minor << 8) | patch
}

/// Minimize the sphere on `[-1, 1]^dim` (with `sigma0 = 0.3`) in C: returns the best value, or NaN if
/// the arguments are rejected (e.g. `pop_size < 5`); fills `xmin` if provided.
/// Safety: caller must ensure `xmin` points to at least `dim` f64s when non-null.
#[no_mangle]
pub unsafe extern "C" fn fastxnes_sphere(
    dim: usize,
    gen: u32,
    pop_size: usize,
    seed: u64,
    xmin: *mut f64,
) -> f64 {
    let objective = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
    let config = match XnesConfigBuilder::new().gen(gen).sigma0(0.3).build() {
        Ok(c) => c,
        Err(_) => return f64::NAN,
    };
    let (xbest, fbest, _algo) =
        match minimize(vec![-1.0; dim], vec![1.0; dim], pop_size, config, seed, objective) {
            Ok(r) => r,
            Err(_) => return f64::NAN,
        };
    if !xmin.is_null() {
        for (i, v) in xbest.iter().enumerate().take(dim) {
            *xmin.add(i) = *v;
        }
    }
    fbest
}
