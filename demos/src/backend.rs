//! Compute backend chosen at build time: `wgpu` when that feature is enabled,
//! `ndarray` otherwise.

use burn::tensor::backend::Backend;
use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "wgpu")] {
        pub type SelectedBackend = burn::backend::Wgpu;
        const BACKEND_NAME: &str = "WGPU (GPU)";
    } else {
        pub type SelectedBackend = burn::backend::NdArray;
        const BACKEND_NAME: &str = "NdArray (CPU)";
    }
}

pub type SelectedDevice = <SelectedBackend as Backend>::Device;

pub fn create_device() -> SelectedDevice {
    SelectedDevice::default()
}

/// Human-readable backend name for the tools' reports.
pub const fn get_backend_name() -> &'static str {
    BACKEND_NAME
}
