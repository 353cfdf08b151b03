//! Linear coordinate scales between a genomic domain and a pixel range.

/// Affine map from a value domain onto a pixel range.
///
/// The inverse map is just another `LinearScale` with domain and pixel range
/// swapped (see [`LinearScale::inverted`]), so there is no second formula to
/// keep in sync.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
    reversed: bool,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            reversed: false,
        }
    }

    /// Flipped pixel direction; used for y-axes where increasing value moves
    /// up the screen.
    pub fn new_reversed(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            reversed: true,
        }
    }

    #[inline(always)]
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    #[inline(always)]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = if self.reversed {
            (self.range.1, self.range.0)
        } else {
            self.range
        };
        if d0 == d1 {
            // Degenerate domain: every value maps to the pixel midpoint.
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) * (r1 - r0) / (d1 - d0)
    }

    /// Pixel-typed convenience for paint code.
    #[inline(always)]
    pub fn px(&self, value: f64) -> f32 {
        self.scale(value) as f32
    }

    /// The pixel→value map, as a scale with swapped arguments.
    pub fn inverted(&self) -> Self {
        Self {
            domain: self.range,
            range: self.domain,
            reversed: self.reversed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_endpoints() {
        let scale = LinearScale::new((100.0, 200.0), (0.0, 1000.0));
        assert_eq!(scale.scale(100.0), 0.0);
        assert_eq!(scale.scale(200.0), 1000.0);
        assert_eq!(scale.scale(150.0), 500.0);
    }

    #[test]
    fn test_reversed_flips_pixel_direction() {
        let scale = LinearScale::new_reversed((0.0, 1.0), (0.0, 100.0));
        assert_eq!(scale.scale(0.0), 100.0);
        assert_eq!(scale.scale(1.0), 0.0);
        assert_eq!(scale.scale(0.25), 75.0);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let scale = LinearScale::new((7_000_000.0, 7_200_000.0), (12.0, 980.0));
        let inverse = scale.inverted();
        for value in [7_000_000.0, 7_014_311.0, 7_100_000.0, 7_199_999.0] {
            let back = inverse.scale(scale.scale(value));
            assert!((back - value).abs() < 1e-6, "{back} != {value}");
        }
    }

    #[test]
    fn test_round_trip_reversed() {
        let scale = LinearScale::new_reversed((-2.0, 2.0), (0.0, 200.0));
        let inverse = scale.inverted();
        for value in [-2.0, -0.5, 0.0, 1.25, 2.0] {
            let back = inverse.scale(scale.scale(value));
            assert!((back - value).abs() < 1e-9, "{back} != {value}");
        }
    }

    #[test]
    fn test_degenerate_domain_maps_to_midpoint() {
        let scale = LinearScale::new((50.0, 50.0), (0.0, 100.0));
        assert_eq!(scale.scale(50.0), 50.0);
        assert_eq!(scale.scale(123.0), 50.0);
        let reversed = LinearScale::new_reversed((50.0, 50.0), (0.0, 100.0));
        assert_eq!(reversed.scale(0.0), 50.0);
    }

    #[test]
    fn test_extrapolates_outside_domain() {
        let scale = LinearScale::new((0.0, 10.0), (0.0, 100.0));
        assert_eq!(scale.scale(-1.0), -10.0);
        assert_eq!(scale.scale(11.0), 110.0);
    }
}
