// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod distribution;
mod problem;

pub use distribution::Distribution;
pub use problem::{InflationProblem, Measurements};
