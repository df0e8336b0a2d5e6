//! Planar ice-thickness product.

use ndarray::{Array1, Array2, Zip, s};

use super::LoaderError;
use crate::io::CoordinateProjection;
use crate::mask::{MaskError, SurfaceType};
use crate::resample::PlanarRaster;
use crate::types::GridPoint;

/// Ice thickness as read from the source product, `(y, x)`.
#[derive(Debug, Clone)]
pub struct IceThicknessSource {
    /// Planar x in m
    pub x: Array1<f64>,
    /// Planar y in m, often stored decreasing
    pub y: Array1<f64>,
    /// Ice thickness in m
    pub thickness: Array2<f64>,
    /// Surface classification codes
    pub surface_type: Array2<u8>,
    /// Projection descriptor attached to the product
    pub projection: String,
}

impl IceThicknessSource {
    /// Check the projection and build a raster of thickness with increasing axes.
    ///
    /// Cells classified as ocean or ice-free land get zero thickness, as do
    /// undefined values.
    ///
    /// # Errors
    /// - `ProjectionMismatch` if the product's descriptor differs from `projection`
    /// - `Mask` for unknown surface codes
    /// - `Raster` for unusable coordinates
    pub fn load<P: CoordinateProjection + ?Sized>(self, projection: &P) -> Result<PlanarRaster, LoaderError> {
        if !projection.matches_descriptor(&self.projection) {
            return Err(LoaderError::ProjectionMismatch {
                expected: projection.descriptor(),
                found: self.projection,
            });
        }
        let expected = (self.y.len(), self.x.len());
        for (what, found) in [
            ("ice thickness", self.thickness.dim()),
            ("ice surface type", self.surface_type.dim()),
        ] {
            if found != expected {
                return Err(LoaderError::ShapeMismatch {
                    what: what.to_string(),
                    expected: vec![expected.0, expected.1],
                    found: vec![found.0, found.1],
                });
            }
        }

        let mut thickness = self.thickness;
        for ((row, col), &code) in self.surface_type.indexed_iter() {
            let surface = SurfaceType::from_code(code).ok_or(MaskError::UnknownSurfaceCode {
                code,
                point: GridPoint::new(row, col),
            })?;
            if matches!(surface, SurfaceType::Ocean | SurfaceType::IceFreeLand) {
                thickness[[row, col]] = 0.0;
            }
        }
        Zip::from(&mut thickness).for_each(|t| {
            if !t.is_finite() {
                *t = 0.0;
            }
        });

        let (mut x, mut y) = (self.x, self.y);
        if y.len() > 1 && y[0] > y[y.len() - 1] {
            y = y.slice(s![..;-1]).to_owned();
            thickness = thickness.slice(s![..;-1, ..]).to_owned();
        }
        if x.len() > 1 && x[0] > x[x.len() - 1] {
            x = x.slice(s![..;-1]).to_owned();
            thickness = thickness.slice(s![.., ..;-1]).to_owned();
        }
        log::info!("ice thickness raster {} x {}", y.len(), x.len());
        Ok(PlanarRaster::new(x, y, thickness)?)
    }
}
