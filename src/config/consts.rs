/// Relative residual and gap tolerance for the interior-point backend
pub const DEFAULT_TOLERANCE: f64 = 1e-8;
/// Iteration cap for the interior-point backend
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
/// A feasibility solve reports `Feasible` when the optimal λ is at least `-tolerance`
pub const DEFAULT_FEASIBILITY_TOLERANCE: f64 = 1e-7;
/// Certificate coefficients at or below this magnitude are dropped
pub const DEFAULT_CHOP_TOLERANCE: f64 = 1e-10;
/// Decimals kept when cleaning certificates
pub const DEFAULT_ROUND_DECIMALS: u32 = 3;
/// Stopping width of the visibility bisection
pub const DEFAULT_SCAN_PRECISION: f64 = 1e-3;
/// Name of the SDPA binary looked up on PATH
pub const DEFAULT_SDPA_EXECUTABLE: &str = "sdpa";
/// Concurrency used when the platform cannot report its parallelism
pub const FALLBACK_CONCURRENCY: usize = 4;
