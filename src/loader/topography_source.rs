//! Geodetic bedrock/ice topography with a surface classification.

use ndarray::{Array1, Array2, s};

use super::{DomainConfig, LoaderError};
use crate::io::CoordinateProjection;
use crate::mask::{MaskConfig, ReferenceCheck, check_reference};
use crate::mesh::{GeodeticGrid, GridAxis, Topography, inside_range};

/// Topography as read from the source product, `(lat, lon)`.
///
/// Either axis may be decreasing.
#[derive(Debug, Clone)]
pub struct TopographySource {
    /// Longitudes in degrees
    pub lon: Array1<f64>,
    /// Latitudes in degrees
    pub lat: Array1<f64>,
    /// Bedrock elevation in m, negative below sea level
    pub bedrock: Array2<f64>,
    /// Ice base elevation in m; equals the surface where there is no ice
    pub ice_base: Array2<f64>,
    /// Surface classification codes
    pub surface_type: Array2<u8>,
}

/// Cropped, checked topography on its native grid.
#[derive(Debug, Clone)]
pub struct LoadedTopography {
    /// Elevations on the cropped grid
    pub topography: Topography,
    /// Surface codes on the cropped grid
    pub surface_type: Array2<u8>,
    /// Outcome of the water-presence check against the surface codes
    pub reference: ReferenceCheck,
}

impl TopographySource {
    /// Check that every field matches the coordinate vectors.
    fn check_shapes(&self) -> Result<(), LoaderError> {
        let expected = (self.lat.len(), self.lon.len());
        let shapes = [
            ("bedrock", self.bedrock.dim()),
            ("ice base", self.ice_base.dim()),
            ("surface type", self.surface_type.dim()),
        ];
        for (what, found) in shapes {
            if found != expected {
                return Err(LoaderError::ShapeMismatch {
                    what: what.to_string(),
                    expected: vec![expected.0, expected.1],
                    found: vec![found.0, found.1],
                });
            }
        }
        Ok(())
    }

    /// Reverse decreasing axes so both coordinates increase.
    pub fn into_increasing(mut self) -> Self {
        if self.lat.len() > 1 && self.lat[0] > self.lat[self.lat.len() - 1] {
            self.lat = self.lat.slice(s![..;-1]).to_owned();
            self.bedrock = self.bedrock.slice(s![..;-1, ..]).to_owned();
            self.ice_base = self.ice_base.slice(s![..;-1, ..]).to_owned();
            self.surface_type = self.surface_type.slice(s![..;-1, ..]).to_owned();
        }
        if self.lon.len() > 1 && self.lon[0] > self.lon[self.lon.len() - 1] {
            self.lon = self.lon.slice(s![..;-1]).to_owned();
            self.bedrock = self.bedrock.slice(s![.., ..;-1]).to_owned();
            self.ice_base = self.ice_base.slice(s![.., ..;-1]).to_owned();
            self.surface_type = self.surface_type.slice(s![.., ..;-1]).to_owned();
        }
        self
    }

    /// Normalize, crop to the domain, and run the load-time checks.
    ///
    /// # Errors
    /// - `ShapeMismatch` if a field does not match the coordinates
    /// - `Grid` for non-monotonic or non-uniform coordinates, or an empty crop
    /// - `Mask` if water presence disagrees with the surface codes beyond
    ///   documented or isolated cells
    pub fn load<P: CoordinateProjection + ?Sized>(
        self,
        domain: &DomainConfig,
        mask: &MaskConfig,
        projection: &P,
    ) -> Result<LoadedTopography, LoaderError> {
        self.check_shapes()?;
        let source = self.into_increasing();
        let bbox = domain.bbox;

        let rows = inside_range(&source.lat, bbox.min_lat, bbox.max_lat);
        let cols = inside_range(&source.lon, bbox.min_lon, bbox.max_lon);
        let (rows, cols) = match (rows, cols) {
            (Some(r), Some(c)) => (r, c),
            _ => return Err(crate::mesh::GridError::EmptyCrop { bbox }.into()),
        };

        let lon = source.lon.slice(s![cols.clone()]).to_owned();
        let lat = source.lat.slice(s![rows.clone()]).to_owned();
        let grid = GeodeticGrid::new(lon, lat, projection)?;
        grid.spacing(GridAxis::Longitude, domain.spacing_tolerance)?;
        grid.spacing(GridAxis::Latitude, domain.spacing_tolerance)?;

        let bedrock = source.bedrock.slice(s![rows.clone(), cols.clone()]).to_owned();
        let ice_base = source.ice_base.slice(s![rows.clone(), cols.clone()]).to_owned();
        let surface_type = source.surface_type.slice(s![rows, cols]).to_owned();

        let reference = check_reference(&bedrock, &ice_base, &surface_type, mask)?;
        let topography = Topography::new(grid, bedrock, ice_base)?;
        log::info!(
            "topography source cropped to {:?} ({:.1}\" x {:.1}\")",
            topography.grid.shape(),
            topography.grid.resolution_arcsec().0,
            topography.grid.resolution_arcsec().1
        );
        Ok(LoadedTopography {
            topography,
            surface_type,
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{GeoBoundingBox, PolarStereographic};
    use crate::mask::MaskError;
    use crate::mesh::GridError;

    /// 6 x 8 source with latitude stored north to south.
    fn source() -> TopographySource {
        let lon = Array1::linspace(-21.0, -17.5, 8);
        let lat = Array1::linspace(79.5, 79.0, 6);
        // ocean in the southern half, stored first-row-north
        let bedrock = Array2::from_shape_fn((6, 8), |(r, _)| if r >= 3 { -200.0 } else { 50.0 });
        let ice_base = Array2::from_shape_fn((6, 8), |(r, _)| if r >= 3 { -50.0 } else { 50.0 });
        let surface_type = Array2::from_shape_fn((6, 8), |(r, _)| if r >= 3 { 3 } else { 2 });
        TopographySource {
            lon,
            lat,
            bedrock,
            ice_base,
            surface_type,
        }
    }

    fn domain() -> DomainConfig {
        DomainConfig::default().with_bbox(GeoBoundingBox::new(-20.6, 78.9, -18.0, 79.6))
    }

    #[test]
    fn test_flip_and_crop() {
        let loaded = source()
            .load(&domain(), &MaskConfig::default(), &PolarStereographic::epsg_3413())
            .unwrap();
        let grid = &loaded.topography.grid;
        // columns -20.5 .. -18.0
        assert_eq!(grid.shape(), (6, 6));
        assert!(grid.lat[0] < grid.lat[5]);
        assert!((grid.lon[0] + 20.5).abs() < 1e-12);
        // southern rows are wet after the flip
        assert_eq!(loaded.topography.bedrock[[0, 0]], -200.0);
        assert_eq!(loaded.surface_type[[5, 0]], 2);
        assert!(loaded.reference.is_exact());
    }

    #[test]
    fn test_reference_disagreement_fails() {
        let mut src = source();
        // a 2 x 2 block classified as ocean over dry land
        for r in 0..2 {
            for c in 2..4 {
                src.surface_type[[r, c]] = 0;
            }
        }
        let err = src
            .load(&domain(), &MaskConfig::default(), &PolarStereographic::epsg_3413())
            .unwrap_err();
        assert!(matches!(err, LoaderError::Mask(MaskError::ReferenceDisagreement { .. })));
    }

    #[test]
    fn test_non_uniform_spacing_fails() {
        let mut src = source();
        src.lon[4] += 0.01;
        let err = src
            .load(&domain(), &MaskConfig::default(), &PolarStereographic::epsg_3413())
            .unwrap_err();
        assert!(matches!(err, LoaderError::Grid(GridError::NonUniformSpacing { .. })));
    }

    #[test]
    fn test_shape_and_crop_errors() {
        let mut src = source();
        src.ice_base = Array2::zeros((6, 7));
        let err = src
            .load(&domain(), &MaskConfig::default(), &PolarStereographic::epsg_3413())
            .unwrap_err();
        assert!(matches!(err, LoaderError::ShapeMismatch { .. }));

        let far = DomainConfig::default().with_bbox(GeoBoundingBox::new(10.0, 60.0, 11.0, 61.0));
        let err = source()
            .load(&far, &MaskConfig::default(), &PolarStereographic::epsg_3413())
            .unwrap_err();
        assert!(matches!(err, LoaderError::Grid(GridError::EmptyCrop { .. })));
    }
}
