use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundingBoxError {
    #[error("degenerate bounding box [{x1}, {y1}, {x2}, {y2}]: requires x1 < x2 and y1 < y2")]
    Degenerate { x1: i32, y1: i32, x2: i32, y2: i32 },
}

/// Axis-aligned detection box in source-photo pixel coordinates.
///
/// Corners are `(x1, y1)` inclusive and `(x2, y2)` exclusive, with
/// `x1 < x2` and `y1 < y2` enforced at construction. Serializes as the
/// `[x1, y1, x2, y2]` array detectors emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[i32; 4]", into = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self, BoundingBoxError> {
        if x1 >= x2 || y1 >= y2 {
            return Err(BoundingBoxError::Degenerate { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Computed in `i64` so boxes spanning the whole `i32` range cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }
}

impl TryFrom<[i32; 4]> for BoundingBox {
    type Error = BoundingBoxError;

    fn try_from(v: [i32; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let b = bbox(10, 20, 40, 60);
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 40);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let b: BoundingBox = serde_json::from_str("[-2147483648, 0, 2147483647, 5]").unwrap();
        assert_eq!(b.width(), u32::MAX as i64);
        assert_eq!(b.height(), 5);
    }

    #[rstest]
    #[case(10, 0, 10, 5)]
    #[case(0, 10, 5, 10)]
    #[case(20, 0, 10, 5)]
    #[case(0, 20, 5, 10)]
    fn test_degenerate_rejected(#[case] x1: i32, #[case] y1: i32, #[case] x2: i32, #[case] y2: i32) {
        assert_eq!(
            BoundingBox::new(x1, y1, x2, y2),
            Err(BoundingBoxError::Degenerate { x1, y1, x2, y2 })
        );
    }

    // ── Serde ────────────────────────────────────────────────────────

    #[test]
    fn test_serializes_as_array() {
        let json = serde_json::to_string(&bbox(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
    }

    #[test]
    fn test_deserialize_rejects_degenerate() {
        let result: Result<BoundingBox, _> = serde_json::from_str("[5,5,5,10]");
        assert!(result.is_err());
    }
}
