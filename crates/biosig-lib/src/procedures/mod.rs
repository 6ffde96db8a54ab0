//! Procedures shipped with the crate, registered by
//! [`ProcedureRegistry::with_builtins`](crate::procedure::ProcedureRegistry::with_builtins).

mod filters;
mod heart;
mod r_peaks;

use crate::procedure::ProcedureFactory;

pub(crate) const BUILTINS: &[(&str, ProcedureFactory)] = &[
    ("filter_bandpass", filters::bandpass_module),
    ("filter_lowpass", filters::lowpass_module),
    ("filter_fft_lowpass", filters::fft_lowpass_module),
    ("points_r_simple", r_peaks::module),
    ("parameter_heart_rate", heart::heart_rate_module),
    ("parameter_rmssd", heart::rmssd_module),
];
