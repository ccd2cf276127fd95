pub mod enforcer;

pub use enforcer::{
    constrain_position, enforce, samples_to_keep, BoundaryAction, PlaybackBoundaryEnforcer,
    Transport,
};
