/// A closed interval of real numbers.
///
/// Used for per-axis box extents and for the parametric range of a
/// clipped segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Expands the interval by `margin` on each side.
    pub fn pad(&self, margin: f32) -> Interval {
        Interval::new(self.min - margin, self.max + margin)
    }

    /// Grows the interval to include x.
    pub fn include(&self, x: f32) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }

    /// Returns true if the interval contains nothing.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// An empty interval (min > max).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// The parametric range of a whole segment, [0, 1].
    pub const UNIT: Interval = Interval { min: 0.0, max: 1.0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_size() {
        let interval = Interval::new(2.0, 7.0);
        assert_eq!(interval.size(), 5.0);

        let negative = Interval::new(-5.0, 5.0);
        assert_eq!(negative.size(), 10.0);
    }

    #[test]
    fn test_interval_pad() {
        let padded = Interval::new(0.0, 10.0).pad(0.5);
        assert_eq!(padded.min, -0.5);
        assert_eq!(padded.max, 10.5);
    }

    #[test]
    fn test_interval_empty_include() {
        let empty = Interval::EMPTY;
        assert!(empty.is_empty());

        let grown = empty.include(3.0).include(-1.0);
        assert!(!grown.is_empty());
        assert_eq!(grown, Interval::new(-1.0, 3.0));
    }
}
