//! Single point of truth for log-domain <-> linear-domain conversion.
//!
//! libchinese-core's `ngram.rs` and `word_bigram.rs` both use bare
//! `f32::ln()` scattered across the module; collecting the conversions into
//! one `LogMath` seam here keeps them from drifting apart between call
//! sites.
//!
//! The on-disk model stores probabilities in log base 10; the host log base
//! used everywhere else in this crate is natural log (`ln`), matching the
//! convention already used throughout the teacher crate's n-gram code.

/// Converts between the on-disk log10 domain, the host's ln domain, and
/// linear probabilities.
#[derive(Debug, Clone, Copy)]
pub struct LogMath {
    /// Multiplies a log10 value to convert it into the host log base.
    log10_to_host: f32,
}

impl Default for LogMath {
    fn default() -> Self {
        Self::natural_log()
    }
}

impl LogMath {
    /// The host log base is natural log (`ln`).
    pub fn natural_log() -> Self {
        Self {
            log10_to_host: std::f32::consts::LN_10,
        }
    }

    /// Converts a value stored on disk in log base 10 into the host log base.
    pub fn to_host(&self, log10_value: f32) -> f32 {
        log10_value * self.log10_to_host
    }

    /// Converts a linear probability into the host log base.
    pub fn linear_to_log(&self, p: f32) -> f32 {
        p.ln()
    }

    /// Converts a host-log-base value back into a linear probability.
    pub fn log_to_linear(&self, log_p: f32) -> f32 {
        log_p.exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log10_half_converts_to_ln_half() {
        let lm = LogMath::natural_log();
        let log10_half = (0.5f32).log10();
        let host = lm.to_host(log10_half);
        assert!((host - (0.5f32).ln()).abs() < 1e-5);
    }

    #[test]
    fn round_trips_through_linear() {
        let lm = LogMath::natural_log();
        let p = 0.125f32;
        let log_p = lm.linear_to_log(p);
        let back = lm.log_to_linear(log_p);
        assert!((back - p).abs() < 1e-6);
    }
}
