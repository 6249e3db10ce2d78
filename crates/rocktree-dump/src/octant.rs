//! Geographic extent of octree paths.
//!
//! The rocktree divides the globe into 8 root octants (two hemispheres by
//! four longitude quadrants). Every further path digit halves latitude and,
//! away from the poles, longitude. Digits `k` and `k + 4` split the
//! non-geographic third axis, so they share the same 2D box.

use crate::error::OctantError;

/// Latitude/longitude rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctantBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Root octant paths with their boxes, south hemisphere first.
pub const ROOT_OCTANTS: [(&str, OctantBox); 8] = [
    ("02", OctantBox::new(0.0, -90.0, -90.0, -180.0)),
    ("03", OctantBox::new(0.0, -90.0, 0.0, -90.0)),
    ("12", OctantBox::new(0.0, -90.0, 90.0, 0.0)),
    ("13", OctantBox::new(0.0, -90.0, 180.0, 90.0)),
    ("20", OctantBox::new(90.0, 0.0, -90.0, -180.0)),
    ("21", OctantBox::new(90.0, 0.0, 0.0, -90.0)),
    ("30", OctantBox::new(90.0, 0.0, 90.0, 0.0)),
    ("31", OctantBox::new(90.0, 0.0, 180.0, 90.0)),
];

/// Check that `lat`/`lon` is a finite point on the globe.
pub fn validate_point(lat: f64, lon: f64) -> Result<(), OctantError> {
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(OctantError::InvalidCoordinate { lat, lon })
    }
}

/// Root octant containing the point.
pub fn root_octant(lat: f64, lon: f64) -> Result<(&'static str, OctantBox), OctantError> {
    validate_point(lat, lon)?;
    let quadrant = match lon {
        lon if lon < -90.0 => 0,
        lon if lon < 0.0 => 1,
        lon if lon < 90.0 => 2,
        _ => 3,
    };
    let hemisphere = if lat < 0.0 { 0 } else { 4 };
    Ok(ROOT_OCTANTS[hemisphere + quadrant])
}

/// Box of a root octant path.
#[must_use]
pub fn root_box(path: &str) -> Option<OctantBox> {
    ROOT_OCTANTS
        .iter()
        .find(|(root, _)| *root == path)
        .map(|&(_, bounds)| bounds)
}

impl OctantBox {
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Normalize two corners given in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Result<Self, OctantError> {
        let rect = Self::new(a.0.max(b.0), a.0.min(b.0), a.1.max(b.1), a.1.min(b.1));
        rect.validate()?;
        Ok(rect)
    }

    /// Check that the box is non-empty and lies on the globe.
    pub fn validate(&self) -> Result<(), OctantError> {
        let on_globe = validate_point(self.north, self.east).is_ok()
            && validate_point(self.south, self.west).is_ok();
        if on_globe && self.north > self.south && self.east > self.west {
            Ok(())
        } else {
            Err(OctantError::InvalidBoundingBox(*self))
        }
    }

    fn touches_pole(&self) -> bool {
        self.north >= 90.0 || self.south <= -90.0
    }

    /// Geographic child (digit in `0..4`) containing the point.
    ///
    /// The point is assumed to lie inside `self`.
    #[must_use]
    pub fn child_for_point(&self, lat: f64, lon: f64) -> (u8, OctantBox) {
        let mid_lat = (self.north + self.south) / 2.0;
        let (mut key, mut child) = if lat < mid_lat {
            (0, Self { north: mid_lat, ..*self })
        } else {
            (2, Self { south: mid_lat, ..*self })
        };

        if !child.touches_pole() {
            let mid_lon = (self.east + self.west) / 2.0;
            if lon < mid_lon {
                child.east = mid_lon;
            } else {
                child.west = mid_lon;
                key += 1;
            }
        }
        (key, child)
    }

    /// All geographic children as `(digit, box)`, digits in `0..4`.
    ///
    /// Halves touching a pole are not split by longitude, so only two or
    /// three children exist for polar boxes.
    #[must_use]
    pub fn children(&self) -> Vec<(u8, OctantBox)> {
        let mid_lat = (self.north + self.south) / 2.0;
        let mid_lon = (self.east + self.west) / 2.0;
        let halves = [
            (0, Self { north: mid_lat, ..*self }),
            (2, Self { south: mid_lat, ..*self }),
        ];

        let mut children = Vec::with_capacity(4);
        for (key, half) in halves {
            if half.touches_pole() {
                children.push((key, half));
            } else {
                children.push((key, Self { east: mid_lon, ..half }));
                children.push((key + 1, Self { west: mid_lon, ..half }));
            }
        }
        children
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }

    /// Whether the boxes overlap with positive area.
    #[must_use]
    pub fn intersects(&self, other: &OctantBox) -> bool {
        self.west < other.east
            && self.east > other.west
            && self.south < other.north
            && self.north > other.south
    }

    /// Whether `self` lies entirely within `other`.
    #[must_use]
    pub fn is_inside(&self, other: &OctantBox) -> bool {
        self.north <= other.north
            && self.south >= other.south
            && self.east <= other.east
            && self.west >= other.west
    }

    /// Smallest box covering both.
    #[must_use]
    pub fn union(&self, other: &OctantBox) -> OctantBox {
        Self::new(
            self.north.max(other.north),
            self.south.min(other.south),
            self.east.max(other.east),
            self.west.min(other.west),
        )
    }
}
