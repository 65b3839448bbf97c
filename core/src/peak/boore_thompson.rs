use ndarray::Array2;
use num_complex::Complex64;
use serde::Deserialize;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::DurationModel;
use crate::math::interp::bilinear;
use crate::prelude::{MotionError, MotionResult, Oscillator, Region, Scenario};

pub const COEFFICIENT_COUNT: usize = 7;

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(rename = "M")]
    magnitudes: Vec<f64>,
    #[serde(rename = "R")]
    distances: Vec<f64>,
    c1: Vec<f64>,
    c2: Vec<f64>,
    c3: Vec<f64>,
    c4: Vec<f64>,
    c5: Vec<f64>,
    c6: Vec<f64>,
    c7: Vec<f64>,
}

fn table_error(message: impl Into<String>) -> MotionError {
    MotionError::Coefficients(message.into())
}

/// Oscillator-duration coefficients `c1..c7` tabulated on a magnitude × ln(distance) grid.
///
/// The published tables are not bundled; callers load them with [`CoefficientTables::read`].
#[derive(Debug, Clone)]
pub struct CoefficientTables {
    magnitudes: Vec<f64>,
    ln_distances: Vec<f64>,
    /// One `(magnitude, distance)` grid per coefficient.
    coefficients: Vec<Array2<f64>>,
}

impl CoefficientTables {
    /// Parses the flattened `{M, R, c1..c7}` layout with magnitude varying fastest.
    ///
    /// The rows must form a complete grid of at least two magnitudes by two
    /// distances, both increasing, with finite coefficients.
    pub fn from_json_str(text: &str) -> MotionResult<Self> {
        let raw: RawTable = serde_json::from_str(text)?;
        let total = raw.magnitudes.len();
        if total == 0 {
            return Err(table_error("empty table"));
        }
        let columns = [
            &raw.distances,
            &raw.c1,
            &raw.c2,
            &raw.c3,
            &raw.c4,
            &raw.c5,
            &raw.c6,
            &raw.c7,
        ];
        if columns.iter().any(|c| c.len() != total) {
            return Err(table_error("all columns must have the same length"));
        }
        let all_finite = raw.magnitudes.iter().all(|v| v.is_finite())
            && columns.iter().all(|c| c.iter().all(|v| v.is_finite()));
        if !all_finite {
            return Err(table_error("table holds non-finite values"));
        }

        let mag_count = raw
            .distances
            .iter()
            .take_while(|&&r| r == raw.distances[0])
            .count();
        if total % mag_count != 0 {
            return Err(table_error(format!(
                "{} entries do not form a grid of {} magnitudes",
                total, mag_count
            )));
        }
        let dist_count = total / mag_count;
        if mag_count < 2 || dist_count < 2 {
            return Err(table_error(format!(
                "a {}x{} grid is too small to interpolate",
                mag_count, dist_count
            )));
        }

        let magnitudes = raw.magnitudes[..mag_count].to_vec();
        let distances: Vec<f64> = (0..dist_count)
            .map(|j| raw.distances[j * mag_count])
            .collect();
        for k in 0..total {
            let (i, j) = (k % mag_count, k / mag_count);
            if raw.magnitudes[k] != magnitudes[i] || raw.distances[k] != distances[j] {
                return Err(table_error(format!(
                    "row {} breaks the magnitude-by-distance grid",
                    k + 1
                )));
            }
        }
        if distances.iter().any(|&r| r <= 0.0) {
            return Err(table_error("distances must be positive"));
        }
        let ln_distances: Vec<f64> = distances.iter().map(|r| r.ln()).collect();
        if magnitudes.windows(2).any(|w| w[1] <= w[0])
            || ln_distances.windows(2).any(|w| w[1] <= w[0])
        {
            return Err(table_error("magnitudes and distances must increase"));
        }

        let coefficients = columns[1..]
            .iter()
            .map(|column| {
                Array2::from_shape_fn((mag_count, dist_count), |(i, j)| column[j * mag_count + i])
            })
            .collect();

        Ok(Self {
            magnitudes,
            ln_distances,
            coefficients,
        })
    }

    /// Reads a table file in the `{M, R, c1..c7}` layout, e.g. `wna_bt15_trms4osc.json`.
    pub fn read(path: impl AsRef<Path>) -> MotionResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let tables = Self::from_json_str(&text).map_err(|err| match err {
            MotionError::Coefficients(message) => {
                MotionError::Coefficients(format!("{}: {}", path.display(), message))
            }
            other => other,
        })?;
        log::info!(
            "loaded {}x{} duration coefficients from {}",
            tables.magnitudes.len(),
            tables.ln_distances.len(),
            path.display()
        );
        Ok(tables)
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn ln_distances(&self) -> &[f64] {
        &self.ln_distances
    }

    /// Tabulated value of coefficient `index` (0 for `c1`) at grid node `(i, j)`.
    pub fn node(&self, index: usize, i: usize, j: usize) -> Option<f64> {
        self.coefficients.get(index)?.get((i, j)).copied()
    }

    /// Bilinear interpolation of all coefficients, clamping onto the grid first.
    pub fn interpolate(&self, magnitude: f64, ln_distance: f64) -> [f64; COEFFICIENT_COUNT] {
        let mag = clamp_to(&self.magnitudes, magnitude);
        let ln_dist = clamp_to(&self.ln_distances, ln_distance);
        let mut out = [0.0; COEFFICIENT_COUNT];
        for (slot, grid) in out.iter_mut().zip(&self.coefficients) {
            *slot = bilinear(&self.magnitudes, &self.ln_distances, grid.view(), mag, ln_dist);
        }
        out
    }

    pub fn contains(&self, magnitude: f64, ln_distance: f64) -> bool {
        clamp_to(&self.magnitudes, magnitude) == magnitude
            && clamp_to(&self.ln_distances, ln_distance) == ln_distance
    }
}

fn clamp_to(axis: &[f64], value: f64) -> f64 {
    match (axis.first(), axis.last()) {
        (Some(&lo), Some(&hi)) => value.clamp(lo, hi),
        _ => value,
    }
}

/// Western and central-eastern tables, shared by every calculator built from them.
#[derive(Debug, Clone)]
pub struct DurationTables {
    wus: Arc<CoefficientTables>,
    ceus: Arc<CoefficientTables>,
}

impl DurationTables {
    pub fn new(wus: CoefficientTables, ceus: CoefficientTables) -> Self {
        Self {
            wus: Arc::new(wus),
            ceus: Arc::new(ceus),
        }
    }

    pub fn read(wus: impl AsRef<Path>, ceus: impl AsRef<Path>) -> MotionResult<Self> {
        Ok(Self::new(
            CoefficientTables::read(wus)?,
            CoefficientTables::read(ceus)?,
        ))
    }

    /// Tables calibrated for `region`; `None` for an unknown region.
    pub fn for_region(&self, region: Region) -> Option<&CoefficientTables> {
        match region {
            Region::Wus => Some(self.wus.as_ref()),
            Region::Ceus => Some(self.ceus.as_ref()),
            Region::Unknown => None,
        }
    }
}

/// Boore & Thompson (2015) oscillator correction of the RMS duration.
#[derive(Debug, Clone)]
pub struct BooreThompsonDuration {
    tables: DurationTables,
    active: Option<[f64; COEFFICIENT_COUNT]>,
    clamped: bool,
}

impl BooreThompsonDuration {
    pub fn new(tables: DurationTables) -> Self {
        Self {
            tables,
            active: None,
            clamped: false,
        }
    }

    /// Coefficients selected by the last scenario; `None` before a scenario or for an unknown region.
    pub fn coefficients(&self) -> Option<[f64; COEFFICIENT_COUNT]> {
        self.active
    }

    /// Whether the last scenario fell outside the grid and was clamped onto it.
    pub fn scenario_clamped(&self) -> bool {
        self.clamped
    }

    pub fn tables(&self) -> &DurationTables {
        &self.tables
    }

    /// Duration ratio for an oscillator, given the selected coefficients.
    pub fn ratio(coefs: &[f64; COEFFICIENT_COUNT], duration: f64, oscillator: Oscillator) -> f64 {
        let [c1, c2, c3, c4, c5, c6, c7] = *coefs;
        let x = 1.0 / (oscillator.freq * duration);
        let xc3 = x.powf(c3);
        let base = c1 + c2 * (1.0 - xc3) / (1.0 + xc3);
        let damping = oscillator.damping / 100.0;
        base * (1.0 + c4 / (2.0 * PI * damping) * (x / (1.0 + c5 * x.powf(c6))).powf(c7))
    }
}

impl DurationModel for BooreThompsonDuration {
    fn set_scenario(&mut self, scenario: &Scenario) {
        let ln_distance = scenario.distance.ln();
        self.clamped = false;
        self.active = match self.tables.for_region(scenario.region) {
            Some(tables) => {
                if !tables.contains(scenario.magnitude, ln_distance) {
                    log::warn!(
                        "scenario M{} at {} km lies outside the duration grid, clamping",
                        scenario.magnitude,
                        scenario.distance
                    );
                    self.clamped = true;
                }
                Some(tables.interpolate(scenario.magnitude, ln_distance))
            }
            None => None,
        };
    }

    fn duration_rms(
        &self,
        duration: f64,
        oscillator: Oscillator,
        _freq: &[f64],
        _site_tf: &[Complex64],
    ) -> f64 {
        match self.active {
            Some(coefs) if oscillator.is_active() => {
                duration * Self::ratio(&coefs, duration, oscillator)
            }
            _ => duration,
        }
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_TABLE: &str = r#"{
    "M": [5.0, 6.0, 5.0, 6.0, 5.0, 6.0],
    "R": [1.0, 1.0, 10.0, 10.0, 100.0, 100.0],
    "c1": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    "c2": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    "c3": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    "c4": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    "c5": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    "c6": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    "c7": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
}"#;

/// Both regions backed by [`SAMPLE_TABLE`].
#[cfg(test)]
pub(crate) fn sample_tables() -> DurationTables {
    let table = CoefficientTables::from_json_str(SAMPLE_TABLE).unwrap();
    DurationTables::new(table.clone(), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn flattened_layout_is_magnitude_fastest() {
        let tables = CoefficientTables::from_json_str(SAMPLE_TABLE).unwrap();
        assert_eq!(tables.magnitudes(), &[5.0, 6.0]);
        assert_eq!(tables.ln_distances().len(), 3);
        assert_eq!(tables.node(0, 1, 0), Some(2.0));
        assert_eq!(tables.node(0, 0, 2), Some(5.0));
    }

    #[test]
    fn interpolation_is_exact_at_nodes_and_clamped_outside() {
        let tables = CoefficientTables::from_json_str(SAMPLE_TABLE).unwrap();
        let ln10 = 10f64.ln();
        assert_eq!(tables.interpolate(6.0, ln10)[0], 4.0);
        assert!((tables.interpolate(5.5, ln10)[0] - 3.5).abs() < 1e-12);
        // Beyond both axes the corner value holds.
        assert_eq!(tables.interpolate(9.0, 1000f64.ln())[0], 6.0);
        assert_eq!(tables.interpolate(1.0, -3.0)[0], 1.0);
        let coefs = tables.interpolate(tables.magnitudes()[0], tables.ln_distances()[0]);
        for (index, value) in coefs.iter().enumerate() {
            assert_eq!(Some(*value), tables.node(index, 0, 0));
        }
    }

    #[test]
    fn tables_are_read_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_TABLE.as_bytes()).unwrap();
        let path = file.into_temp_path();
        let tables = DurationTables::read(&path, &path).unwrap();
        assert!(tables.for_region(Region::Ceus).is_some());
        assert!(tables.for_region(Region::Unknown).is_none());
        assert!(CoefficientTables::read("missing_bt15_table.json").is_err());
    }

    #[test]
    fn ratio_only_applies_to_damped_oscillators() {
        let mut model = BooreThompsonDuration::new(sample_tables());
        model.set_scenario(&Scenario::new(5.5, 10.0, Region::Wus));
        assert_eq!(model.duration_rms(8.0, Oscillator::NONE, &[], &[]), 8.0);

        let corrected = model.duration_rms(8.0, Oscillator::new(1.0, 5.0), &[], &[]);
        let coefs = model.coefficients().unwrap();
        let expected = 8.0 * BooreThompsonDuration::ratio(&coefs, 8.0, Oscillator::new(1.0, 5.0));
        assert!((corrected - expected).abs() < 1e-12);
        assert!((corrected - 8.0 * 3.5).abs() < 1e-12);
        assert!(!model.scenario_clamped());
    }

    #[test]
    fn out_of_grid_scenarios_are_clamped_and_flagged() {
        let mut model = BooreThompsonDuration::new(sample_tables());
        model.set_scenario(&Scenario::new(7.5, 10.0, Region::Wus));
        assert!(model.scenario_clamped());
        assert_eq!(model.coefficients().unwrap()[0], 4.0);

        model.set_scenario(&Scenario::new(6.0, 10.0, Region::Wus));
        assert!(!model.scenario_clamped());
    }

    #[test]
    fn unknown_region_disables_the_correction() {
        let mut model = BooreThompsonDuration::new(sample_tables());
        model.set_scenario(&Scenario::new(5.5, 20.0, Region::Unknown));
        assert!(model.coefficients().is_none());
        assert!(!model.scenario_clamped());
        assert_eq!(model.duration_rms(8.0, Oscillator::new(1.0, 5.0), &[], &[]), 8.0);
    }

    #[test]
    fn malformed_tables_are_rejected() {
        let mismatched =
            r#"{"M":[5.0],"R":[1.0],"c1":[],"c2":[],"c3":[],"c4":[],"c5":[],"c6":[],"c7":[]}"#;
        assert!(CoefficientTables::from_json_str(mismatched).is_err());

        let single_distance = r#"{"M":[5.0,6.0],"R":[1.0,1.0],"c1":[1,1],"c2":[0,0],
            "c3":[1,1],"c4":[0,0],"c5":[0,0],"c6":[1,1],"c7":[1,1]}"#;
        assert!(CoefficientTables::from_json_str(single_distance).is_err());

        let broken_grid = SAMPLE_TABLE.replacen(
            "[5.0, 6.0, 5.0, 6.0, 5.0, 6.0]",
            "[5.0, 6.0, 5.0, 6.5, 5.0, 6.0]",
            1,
        );
        assert!(CoefficientTables::from_json_str(&broken_grid).is_err());

        let zero_distance = SAMPLE_TABLE.replacen(
            "[1.0, 1.0, 10.0, 10.0, 100.0, 100.0]",
            "[0.0, 0.0, 10.0, 10.0, 100.0, 100.0]",
            1,
        );
        assert!(CoefficientTables::from_json_str(&zero_distance).is_err());
    }
}
