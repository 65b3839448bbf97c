use serde::{Deserialize, Serialize};

use crate::prelude::{MotionError, MotionResult};

const MAX_ITERATIONS: usize = 10;
const TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CrustalLayer {
    /// Thickness (km); ignored for the bottom layer, which extends to infinity.
    pub thickness: f64,
    /// Shear-wave velocity (km/s).
    pub velocity: f64,
    /// Density (g/cm³).
    pub density: f64,
}

impl CrustalLayer {
    pub fn new(thickness: f64, velocity: f64, density: f64) -> Self {
        Self {
            thickness,
            velocity,
            density,
        }
    }
}

/// Layered crust evaluated with the quarter-wavelength method.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrustalModel {
    layers: Vec<CrustalLayer>,
}

impl CrustalModel {
    pub fn new(layers: Vec<CrustalLayer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[CrustalLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn set_layer(&mut self, index: usize, layer: CrustalLayer) -> MotionResult<()> {
        let slot = self.layers.get_mut(index).ok_or_else(|| {
            MotionError::InvalidInput(format!("no crustal layer at row {}", index))
        })?;
        *slot = layer;
        Ok(())
    }

    /// Inserts `count` zeroed layers before `row`.
    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let row = row.min(self.layers.len());
        let blank = CrustalLayer::new(0.0, 0.0, 0.0);
        self.layers.splice(row..row, std::iter::repeat(blank).take(count));
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        let start = row.min(self.layers.len());
        let end = (row + count).min(self.layers.len());
        self.layers.drain(start..end);
    }

    /// Thickness-weighted average of `property` from the surface down to `max_depth`.
    pub fn average_value(thickness: &[f64], property: &[f64], max_depth: f64) -> f64 {
        if max_depth <= 0.0 || property.is_empty() {
            return property.first().copied().unwrap_or(0.0);
        }
        let mut top = 0.0;
        let mut sum = 0.0;
        for (i, (&h, &value)) in thickness.iter().zip(property).enumerate() {
            let last = i + 1 == property.len().min(thickness.len());
            if last || max_depth <= top + h {
                sum += (max_depth - top) * value;
                break;
            }
            sum += h * value;
            top += h;
        }
        sum / max_depth
    }

    /// Quarter-wavelength amplification at each frequency.
    pub fn calculate(&self, freq: &[f64]) -> MotionResult<Vec<f64>> {
        let surface = self
            .layers
            .first()
            .ok_or_else(|| MotionError::InvalidInput("crustal model has no layers".into()))?;
        if self.layers.iter().any(|l| l.velocity <= 0.0 || l.density <= 0.0) {
            return Err(MotionError::InvalidInput(
                "crustal velocities and densities must be positive".into(),
            ));
        }

        let thickness: Vec<f64> = self.layers.iter().map(|l| l.thickness).collect();
        let slowness: Vec<f64> = self.layers.iter().map(|l| 1.0 / l.velocity).collect();
        let density: Vec<f64> = self.layers.iter().map(|l| l.density).collect();
        let impedance = surface.velocity * surface.density;

        let amps = freq
            .iter()
            .map(|&f| {
                let mut avg_slow = slowness[0];
                let mut depth = 1.0 / (4.0 * f * avg_slow);
                for _ in 0..MAX_ITERATIONS {
                    depth = 1.0 / (4.0 * f * avg_slow);
                    let previous = avg_slow;
                    avg_slow = Self::average_value(&thickness, &slowness, depth);
                    if ((previous - avg_slow) / avg_slow).abs() <= TOLERANCE {
                        break;
                    }
                }
                let avg_density = Self::average_value(&thickness, &density, depth);
                (impedance / (avg_density / avg_slow)).sqrt()
            })
            .collect();
        Ok(amps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer() -> CrustalModel {
        CrustalModel::new(vec![
            CrustalLayer::new(1.0, 2.0, 2.5),
            CrustalLayer::new(0.0, 3.5, 2.8),
        ])
    }

    #[test]
    fn average_includes_partial_and_infinite_layers() {
        let thickness = [1.0, 2.0, 0.0];
        let property = [1.0, 2.0, 4.0];
        assert!((CrustalModel::average_value(&thickness, &property, 0.5) - 1.0).abs() < 1e-12);
        assert!((CrustalModel::average_value(&thickness, &property, 2.0) - 1.5).abs() < 1e-12);
        // 1·1 + 2·2 + 1·4 over 4 km.
        assert!((CrustalModel::average_value(&thickness, &property, 4.0) - 2.25).abs() < 1e-12);
    }

    #[test]
    fn uniform_half_space_has_unit_amplification() {
        let model = CrustalModel::new(vec![CrustalLayer::new(0.0, 3.0, 2.7)]);
        let amps = model.calculate(&[0.1, 1.0, 10.0]).unwrap();
        assert!(amps.iter().all(|a| (a - 1.0).abs() < 1e-12));
    }

    #[test]
    fn deeper_quarter_wavelengths_average_stiffer_layers() {
        let amps = two_layer().calculate(&[0.05, 0.5, 50.0]).unwrap();
        // A quarter wavelength of 1 km or less only samples the surface layer.
        assert!((amps[1] - 1.0).abs() < 1e-12);
        assert!((amps[2] - 1.0).abs() < 1e-12);
        assert!(amps[0] < 1.0 && amps[0] > 0.5);
    }

    #[test]
    fn row_edits_shift_layers() {
        let mut model = two_layer();
        model.insert_rows(1, 2);
        assert_eq!(model.len(), 4);
        assert_eq!(model.layers()[1].velocity, 0.0);
        model.remove_rows(1, 2);
        assert_eq!(model, two_layer());
        assert!(model.set_layer(5, CrustalLayer::new(1.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(CrustalModel::default().calculate(&[1.0]).is_err());
    }
}
