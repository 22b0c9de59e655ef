//! Geolocated grids built from projection parameters and extents

use crate::types::{AreaExtent, Channel, ProjectionParameters};
use serde::{Deserialize, Serialize};

/// A regular grid in the geostationary projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDefinition {
    pub area_id: String,
    pub description: String,
    pub proj_id: String,
    pub projection: ProjectionParameters,
    /// Number of columns
    pub width: usize,
    /// Number of lines
    pub height: usize,
    pub extent: AreaExtent,
}

impl AreaDefinition {
    pub fn new(
        channel: Channel,
        description: &str,
        projection: ProjectionParameters,
        height: usize,
        width: usize,
        extent: AreaExtent,
    ) -> Self {
        let (area_id, proj_id) = if channel.is_hrv() {
            ("geos_seviri_hrv", "seviri_hrv")
        } else {
            ("geos_seviri_visir", "seviri_visir")
        };
        Self {
            area_id: area_id.to_string(),
            description: description.to_string(),
            proj_id: proj_id.to_string(),
            projection,
            width,
            height,
            extent,
        }
    }

    pub fn proj_string(&self) -> String {
        format!(
            "+proj=geos +a={} +b={} +h={} +lon_0={} +units=m +no_defs",
            self.projection.a, self.projection.b, self.projection.h, self.projection.ssp_longitude
        )
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Signed pixel width in projection meters
    pub fn pixel_size_x(&self) -> f64 {
        self.extent.width() / self.width as f64
    }

    /// Signed pixel height in projection meters
    pub fn pixel_size_y(&self) -> f64 {
        self.extent.height() / self.height as f64
    }
}

/// Area of a dataset: one grid, or grids stacked line-wise from the bottom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Area {
    Single(AreaDefinition),
    Stacked(Vec<AreaDefinition>),
}

impl Area {
    /// Drop empty members and collapse a one-member stack
    pub fn squeeze(self) -> Area {
        match self {
            Area::Single(def) => Area::Single(def),
            Area::Stacked(defs) => {
                let mut defs: Vec<AreaDefinition> =
                    defs.into_iter().filter(|d| !d.is_empty()).collect();
                if defs.len() == 1 {
                    Area::Single(defs.remove(0))
                } else {
                    Area::Stacked(defs)
                }
            }
        }
    }

    pub fn definitions(&self) -> &[AreaDefinition] {
        match self {
            Area::Single(def) => std::slice::from_ref(def),
            Area::Stacked(defs) => defs,
        }
    }

    /// (lines, columns) of the composed grid
    pub fn shape(&self) -> (usize, usize) {
        let defs = self.definitions();
        let lines = defs.iter().map(|d| d.height).sum();
        let columns = defs.iter().map(|d| d.width).max().unwrap_or(0);
        (lines, columns)
    }
}
