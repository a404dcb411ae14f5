use crate::math::mercator::bounds_to_tile_range;
use crate::tiles::TileRange;

/// Geographic bounding box in degrees.
///
/// Antimeridian-crossing boxes are not representable: `west < east` always.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("bounding box has non-finite coordinates")]
    NonFinite,
    #[error("bounding box west ({west}) must be less than east ({east})")]
    InvertedLongitude { west: f64, east: f64 },
    #[error("bounding box south ({south}) must be less than north ({north})")]
    InvertedLatitude { south: f64, north: f64 },
}

impl GeoBoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BoundsError> {
        let bbox = Self {
            west,
            south,
            east,
            north,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// `[west, south, east, north]`, the usual GeoJSON bbox order.
    pub fn from_array(v: [f64; 4]) -> Result<Self, BoundsError> {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn validate(&self) -> Result<(), BoundsError> {
        if ![self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(BoundsError::NonFinite);
        }
        if self.west >= self.east {
            return Err(BoundsError::InvertedLongitude {
                west: self.west,
                east: self.east,
            });
        }
        if self.south >= self.north {
            return Err(BoundsError::InvertedLatitude {
                south: self.south,
                north: self.north,
            });
        }
        Ok(())
    }

    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) * 0.5,
            (self.south + self.north) * 0.5,
        )
    }

    pub fn tile_range(&self, z: u8) -> TileRange {
        bounds_to_tile_range(self, z)
    }
}

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Smallest box around `points`, or `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb3::new(first, first);
        for p in iter {
            for axis in 0..3 {
                out.min[axis] = out.min[axis].min(p[axis]);
                out.max[axis] = out.max[axis].max(p[axis]);
            }
        }
        Some(out)
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb3, BoundsError, GeoBoundingBox};

    #[test]
    fn rejects_inverted_boxes() {
        assert_eq!(
            GeoBoundingBox::new(1.0, 0.0, 1.0, 1.0),
            Err(BoundsError::InvertedLongitude {
                west: 1.0,
                east: 1.0
            })
        );
        assert!(matches!(
            GeoBoundingBox::new(0.0, 2.0, 1.0, 1.0),
            Err(BoundsError::InvertedLatitude { .. })
        ));
        assert_eq!(
            GeoBoundingBox::new(f64::NAN, 0.0, 1.0, 1.0),
            Err(BoundsError::NonFinite)
        );
    }

    #[test]
    fn center_is_midpoint() {
        let bbox = GeoBoundingBox::from_array([-2.0, 10.0, 4.0, 12.0]).unwrap();
        assert_eq!(bbox.center(), (1.0, 11.0));
        assert_eq!(bbox.width_deg(), 6.0);
        assert_eq!(bbox.height_deg(), 2.0);
    }

    #[test]
    fn aabb_from_points() {
        let aabb = Aabb3::from_points([[0.0, 1.0, 2.0], [-1.0, 5.0, 0.5]]).unwrap();
        assert_eq!(aabb.min, [-1.0, 1.0, 0.5]);
        assert_eq!(aabb.max, [0.0, 5.0, 2.0]);
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }
}
