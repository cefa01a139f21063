mod derived_set;
mod transition_tip;

pub use derived_set::{compute_all, DerivedBpmSet, TipResult};
pub use transition_tip::{
    default_tips, TipKind, TransitionTip, RANGE_LOWER, RANGE_TITLE, RANGE_UPPER,
};
