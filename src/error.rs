use {super::*, snafu::Snafu};

/// One variant per distinguishable fallible boundary this crate owns.
/// Network and protocol-framing failures are recovered locally (logged,
/// connection retried) rather than routed through this enum; this type is
/// for failures that need to be told apart by the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MinerError {
    #[snafu(display("GPU mining requested but this build has no GPU support"))]
    GpuUnavailable,

    #[snafu(display("no OpenCL platforms available"))]
    GpuNoPlatforms,

    #[snafu(display("invalid platform id {platform_id}: {cause}"))]
    GpuPlatform {
        platform_id: usize,
        cause: anyhow::Error,
    },

    #[snafu(display("invalid hex value for {field}: '{input}'"))]
    InvalidHex { field: &'static str, input: String },

    #[snafu(display("difficulty must be finite and > 0, got {value}"))]
    InvalidDifficulty { value: f64 },

    #[snafu(display("invalid device '{input}', expected CPU or GPU"))]
    InvalidDevice { input: String },
}
