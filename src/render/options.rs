use crate::{
    foundation::error::{FilterError, FilterResult},
    render::bank::DEFAULT_BANK_CAPACITY,
};

/// Upper bound on noise synthesis workers regardless of hardware.
pub const MAX_NOISE_WORKERS: usize = 16;

/// Largest canvas, in pixels, the convolution and morphology effects accept.
pub const DEFAULT_MAX_KERNEL_PIXELS: u64 = 4096 * 4096;

/// Runtime knobs of a [`crate::Filter`].
///
/// `Default` honours `FILTERFX_BANK_CAPACITY` and `FILTERFX_NOISE_WORKERS` when they hold
/// positive integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterOptions {
    /// Buffers one pass may take from the image bank.
    pub bank_capacity: usize,
    /// Worker cap for turbulence; the effective count is also bounded by hardware threads and
    /// [`MAX_NOISE_WORKERS`].
    pub noise_workers: usize,
    /// Pixel ceiling for the convolution and morphology effects.
    pub max_kernel_pixels: u64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            bank_capacity: env_usize("FILTERFX_BANK_CAPACITY").unwrap_or(DEFAULT_BANK_CAPACITY),
            noise_workers: env_usize("FILTERFX_NOISE_WORKERS").unwrap_or(MAX_NOISE_WORKERS),
            max_kernel_pixels: DEFAULT_MAX_KERNEL_PIXELS,
        }
    }
}

impl FilterOptions {
    pub fn validate(&self) -> FilterResult<()> {
        if self.bank_capacity == 0 {
            return Err(FilterError::config("bank_capacity must be > 0"));
        }
        if self.noise_workers == 0 {
            return Err(FilterError::config("noise_workers must be > 0"));
        }
        Ok(())
    }

    /// Worker threads turbulence synthesis actually uses.
    pub fn effective_noise_workers(&self) -> usize {
        let hw = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.noise_workers.min(hw).min(MAX_NOISE_WORKERS).max(1)
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/options.rs"]
mod tests;
