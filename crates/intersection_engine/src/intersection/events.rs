//! Direct intersection transitions

use crate::foundation::collections::{ObjectId, TesterId};
use crate::foundation::math::Vec3;

/// How a tester's direct intersection changed this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntersectionEventKind {
    /// The tester started touching the object
    Enter,
    /// The tester kept touching the object after moving
    Stay,
    /// The tester stopped touching the object
    Exit,
}

/// One transition of a tester's direct intersection record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEvent {
    /// Tester whose record changed
    pub tester: TesterId,
    /// Transition kind
    pub kind: IntersectionEventKind,
    /// Object entered, kept, or left
    pub object: ObjectId,
    /// World contact point; the last known contact for `Exit`
    pub contact: Vec3,
}
