//! Angular arithmetic in degrees. Every comparison between two headings in
//! this crate goes through [`angular_diff`], so that 359° and 1° are 2° apart
//! rather than 358°.

/// Angles in this crate are plain `f64`s measured in degrees.
pub type Degree = f64;

/// Wraps an angle into the half-open range (-180°, 180°].
pub fn normalize(angle: Degree) -> Degree {
    if angle > -180.0 && angle <= 180.0 {
        return angle;
    }
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// The signed, shortest-path difference `a - b`. The magnitude of the result
/// never exceeds 180°.
pub fn angular_diff(a: Degree, b: Degree) -> Degree {
    normalize(a - b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn normalize_known_values() {
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(180.0), 180.0);
        assert_eq!(normalize(-180.0), 180.0);
        assert_eq!(normalize(181.0), -179.0);
        assert_eq!(normalize(360.0), 0.0);
        assert_eq!(normalize(-90.0), -90.0);
        assert_eq!(normalize(725.0), 5.0);
        assert_eq!(normalize(-725.0), -5.0);
    }

    #[test]
    fn seam_difference_is_short() {
        assert!((angular_diff(1.0, 359.0) - 2.0).abs() < EPS);
        assert!((angular_diff(359.0, 1.0) + 2.0).abs() < EPS);
        assert!((angular_diff(-179.0, 179.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn diff_is_in_range_and_antisymmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let a: f64 = rng.gen_range(-1080.0..1080.0);
            let b: f64 = rng.gen_range(-1080.0..1080.0);
            let ab = angular_diff(a, b);
            let ba = angular_diff(b, a);
            assert!(ab > -180.0 && ab <= 180.0, "{a} - {b} gave {ab}");
            if (ab.abs() - 180.0).abs() > 1e-6 {
                assert!((ab + ba).abs() < 1e-6, "{ab} vs {ba}");
            }
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10_000 {
            let x: f64 = rng.gen_range(-5000.0..5000.0);
            let once = normalize(x);
            assert_eq!(normalize(once), once);
        }
    }
}
