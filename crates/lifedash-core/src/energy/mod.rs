//! Daily work-window resolution.
//!
//! Energy is the number of seconds left in the work session currently in
//! effect. Outside that session it is zero; there is no pre-charging ahead
//! of the next window.

mod window;

pub use window::{energy_progress_pct, resolve, WorkWindow};
