pub mod solver;

pub use solver::SdpSolver;
