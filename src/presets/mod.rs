//! Ready-made patches.
//!
//! Each preset is patch bytes built with [`PatchBuilder`](crate::PatchBuilder),
//! ready for [`SynthController::select_patch`](crate::SynthController::select_patch)
//! or a bank entry. Use them as starting points, or read them to see how
//! the parameter blocks combine into a sound.
//!
//! ```
//! use polycore::presets;
//! use polycore::Patch;
//!
//! for bytes in [presets::lead(), presets::bass(), presets::pad(), presets::pluck(), presets::bell()] {
//!     assert!(Patch::from_bytes(&bytes).is_ok());
//! }
//! ```

mod bass;
mod bell;
mod lead;
mod pad;
mod pluck;

pub use bass::bass;
pub use bell::bell;
pub use lead::lead;
pub use pad::pad;
pub use pluck::pluck;

/// Every preset in program order, for loading as a bank.
pub fn bank() -> Vec<Vec<u8>> {
    vec![lead(), bass(), pad(), pluck(), bell()]
}
