//! Handle types and handle-keyed collections
//!
//! Scene objects, testers and ray origins are all addressed through
//! generational slot-map keys, so a stale handle can never alias a newer
//! entry that reused the same slot.

pub use slotmap::{SlotMap, SecondaryMap};

slotmap::new_key_type! {
    /// Handle to an object living in a [`SceneProvider`](crate::scene::SceneProvider)
    pub struct ObjectId;

    /// Handle to a tester registered with the intersection engine
    pub struct TesterId;

    /// Handle to a ray origin registered with the query service
    pub struct RayOriginId;
}
