// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Matrices substituted for empty series files.

/// Builds the matrix read in place of an empty file
pub type DefaultMatrix = fn() -> Vec<Vec<f64>>;

const HOURS: usize = 8760;
const DAYS: usize = 365;
const MONTHS: usize = 12;

fn filled(rows: usize, row: &[f64]) -> Vec<Vec<f64>> {
    vec![row.to_vec(); rows]
}

#[must_use]
pub fn hourly_zeros() -> Vec<Vec<f64>> {
    filled(HOURS, &[0.0])
}

#[must_use]
pub fn hourly_ones() -> Vec<Vec<f64>> {
    filled(HOURS, &[1.0])
}

#[must_use]
pub fn daily_zeros() -> Vec<Vec<f64>> {
    filled(DAYS, &[0.0])
}

#[must_use]
pub fn monthly_zeros() -> Vec<Vec<f64>> {
    filled(MONTHS, &[0.0])
}

/// Hydro `maxpower`: generation and pumping power with their durations
#[must_use]
pub fn max_power() -> Vec<Vec<f64>> {
    filled(DAYS, &[0.0, 24.0, 0.0, 24.0])
}

/// Hydro reservoir levels: minimum, average, maximum
#[must_use]
pub fn reservoir() -> Vec<Vec<f64>> {
    filled(DAYS, &[0.0, 0.5, 1.0])
}

#[must_use]
pub fn inflow_pattern() -> Vec<Vec<f64>> {
    filled(DAYS, &[1.0])
}

/// Hydro credit modulations: 2 rows of 101 reservoir levels
#[must_use]
pub fn credit_modulation() -> Vec<Vec<f64>> {
    filled(2, &[1.0; 101])
}

#[must_use]
pub fn water_values() -> Vec<Vec<f64>> {
    filled(DAYS, &[0.0; 101])
}
