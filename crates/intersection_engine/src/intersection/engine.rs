//! Intersection engine
//!
//! Owns the testers, their direct intersection records, the spatial index
//! and the collision oracle. The host calls [`IntersectionEngine::tick`] once
//! per frame:
//!
//! 1. **Reconciliation** - objects destroyed or changed since they were
//!    indexed are removed, the survivors re-added with fresh bounds, and the
//!    index trimmed.
//! 2. **Tester pass** - every tester is driven through its state machine:
//!    inactive testers exit, stationary testers keep their record, moved
//!    testers run broad phase then narrow phase and record the first hit.
//!
//! Narrow-phase tests run one after another on the single oracle; nothing
//! in here is shared across threads.

use std::collections::{HashMap, HashSet};

use crate::config::IntersectionConfig;
use crate::foundation::collections::{ObjectId, RayOriginId, SecondaryMap, SlotMap, TesterId};
use crate::foundation::math::{Transform, Vec3};
use crate::intersection::events::{IntersectionEvent, IntersectionEventKind};
use crate::intersection::geometry;
use crate::intersection::{IntersectionError, Tester};
use crate::physics::collision::CollisionOracle;
use crate::scene::{SceneObject, SceneProvider, AABB};
use crate::spatial::{OctreeIndex, SpatialIndex};

/// Caller-supplied filter; objects it accepts are never intersected
pub type ExclusionPredicate = Box<dyn Fn(ObjectId, &SceneObject) -> bool + Send>;

/// The object a tester currently touches
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectIntersection {
    /// Touched object, `None` when touching nothing
    pub object: Option<ObjectId>,
    /// World contact point of the last accepted hit
    pub contact: Vec3,
}

/// The first object hit from a ray origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RayIntersection {
    /// Hit object, `None` for no hit
    pub object: Option<ObjectId>,
    /// Distance to the hit, 0 for no hit
    pub distance: f32,
}

/// Spatial intersection engine
pub struct IntersectionEngine {
    pub(super) config: IntersectionConfig,
    pub(super) index: Box<dyn SpatialIndex>,
    pub(super) oracle: CollisionOracle,
    testers: SlotMap<TesterId, Tester>,
    direct: SecondaryMap<TesterId, DirectIntersection>,
    pub(super) ray_origins: SlotMap<RayOriginId, Transform>,
    pub(super) ray_records: SecondaryMap<RayOriginId, RayIntersection>,
    pub(super) disabled_ray_origins: HashSet<RayOriginId>,
    pub(super) standard_ignore: Vec<ObjectId>,
    indexed_revisions: HashMap<ObjectId, u64>,
    pub(super) exclusion: Option<ExclusionPredicate>,
    events: Vec<IntersectionEvent>,
    pub(super) candidates: Vec<ObjectId>,
    pub(super) sorted: Vec<(f32, ObjectId)>,
    pub(super) pending_removals: Vec<ObjectId>,
    pub(super) running: bool,
}

impl IntersectionEngine {
    /// Create an engine over the given broad-phase index
    pub fn new(config: IntersectionConfig, index: Box<dyn SpatialIndex>) -> Result<Self, IntersectionError> {
        config.validate()?;
        log::info!(
            "Creating intersection engine (candidate ceiling {}, player margin {})",
            config.max_tests_per_tester,
            config.player_bounds_margin
        );

        Ok(Self {
            oracle: CollisionOracle::new(config.scale_epsilon),
            config,
            index,
            testers: SlotMap::with_key(),
            direct: SecondaryMap::new(),
            ray_origins: SlotMap::with_key(),
            ray_records: SecondaryMap::new(),
            disabled_ray_origins: HashSet::new(),
            standard_ignore: Vec::new(),
            indexed_revisions: HashMap::new(),
            exclusion: None,
            events: Vec::new(),
            candidates: Vec::new(),
            sorted: Vec::new(),
            pending_removals: Vec::new(),
            running: true,
        })
    }

    /// Create an engine backed by an [`OctreeIndex`] laid out per `config.octree`
    pub fn with_octree(config: IntersectionConfig) -> Result<Self, IntersectionError> {
        let index = Box::new(OctreeIndex::new(config.octree.clone()));
        Self::new(config, index)
    }

    /// Active configuration
    pub fn config(&self) -> &IntersectionConfig {
        &self.config
    }

    /// Install the exclusion predicate
    ///
    /// Applies to objects indexed from now on and to every candidate test.
    pub fn set_exclusion_predicate<F>(&mut self, predicate: F)
    where
        F: Fn(ObjectId, &SceneObject) -> bool + Send + 'static,
    {
        self.exclusion = Some(Box::new(predicate));
    }

    /// Remove the exclusion predicate
    pub fn clear_exclusion_predicate(&mut self) {
        self.exclusion = None;
    }

    /// Whether the exclusion predicate rejects this object
    pub fn is_excluded(&self, id: ObjectId, object: &SceneObject) -> bool {
        is_excluded(self.exclusion.as_ref(), id, object)
    }

    /// Index every object the scene currently holds
    pub fn setup<S>(&mut self, scene: &S)
    where
        S: SceneProvider + ?Sized,
    {
        let mut entries = Vec::new();
        for id in scene.object_ids() {
            let Some(object) = scene.object(id) else {
                continue;
            };
            if object.local_bounds().is_none() || self.is_excluded(id, object) {
                continue;
            }
            entries.push((id, object.world_bounds()));
            self.indexed_revisions.insert(id, object.revision());
        }

        self.index.add_objects(&entries);
        log::info!("Indexed {} scene objects", entries.len());
    }

    /// Index an object created after [`IntersectionEngine::setup`]
    pub fn add_object<S>(&mut self, scene: &S, id: ObjectId) -> bool
    where
        S: SceneProvider + ?Sized,
    {
        let Some(object) = scene.object(id) else {
            return false;
        };
        if self.is_excluded(id, object) {
            return false;
        }
        self.index.add_objects(&[(id, object.world_bounds())]);
        self.indexed_revisions.insert(id, object.revision());
        true
    }

    /// Drop an object from the index
    pub fn remove_object(&mut self, id: ObjectId) {
        self.index.remove_objects(&[id]);
        self.indexed_revisions.remove(&id);
    }

    /// Register a tester; its record starts empty
    pub fn add_tester(&mut self, tester: Tester) -> TesterId {
        let id = self.testers.insert(tester);
        self.direct.insert(id, DirectIntersection::default());
        log::debug!("Registered tester {id:?}");
        id
    }

    /// Unregister a tester, emitting `Exit` if it was touching something
    pub fn remove_tester(&mut self, id: TesterId) -> Result<Tester, IntersectionError> {
        record_exit(&mut self.direct, &mut self.events, id);
        self.direct.remove(id);
        self.testers.remove(id).ok_or(IntersectionError::UnknownTester(id))
    }

    /// Borrow a tester
    pub fn tester(&self, id: TesterId) -> Option<&Tester> {
        self.testers.get(id)
    }

    /// Mutably borrow a tester, e.g. to move it
    pub fn tester_mut(&mut self, id: TesterId) -> Option<&mut Tester> {
        self.testers.get_mut(id)
    }

    /// Registered testers
    pub fn testers(&self) -> impl Iterator<Item = (TesterId, &Tester)> {
        self.testers.iter()
    }

    /// The object and contact point a tester currently touches
    pub fn intersected_object_for_tester(&self, id: TesterId) -> Option<(ObjectId, Vec3)> {
        let record = self.direct.get(id)?;
        record.object.map(|object| (object, record.contact))
    }

    /// Full record of a tester
    pub fn direct_intersection(&self, id: TesterId) -> Option<&DirectIntersection> {
        self.direct.get(id)
    }

    /// Take the transitions recorded since the last drain
    ///
    /// A moving tester records a Stay every tick it keeps touching, so hosts
    /// should drain once per tick. At most `max_pending_events` are kept; the
    /// oldest are dropped first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = IntersectionEvent> + '_ {
        self.events.drain(..)
    }

    /// The shared narrow-phase surface
    pub fn oracle(&self) -> &CollisionOracle {
        &self.oracle
    }

    /// The broad-phase index
    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    /// False after [`IntersectionEngine::shutdown`]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop reconciliation and release the index and oracle buffers
    ///
    /// Later ticks and queries do nothing.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.index.clear();
        self.oracle.release();
        self.indexed_revisions.clear();
        self.pending_removals.clear();
        log::info!("Intersection engine shutdown complete");
    }

    /// Advance one frame: reconcile the index, then run every tester
    pub fn tick<S>(&mut self, scene: &S)
    where
        S: SceneProvider + ?Sized,
    {
        if !self.running {
            return;
        }
        self.reconcile(scene);
        self.process_testers(scene);
        self.cap_events();
    }

    fn cap_events(&mut self) {
        let overflow = self.events.len().saturating_sub(self.config.max_pending_events);
        if overflow > 0 {
            self.events.drain(..overflow);
            log::warn!("Dropped {overflow} undrained intersection events");
        }
    }

    /// Bring the index in line with the live scene
    fn reconcile<S>(&mut self, scene: &S)
    where
        S: SceneProvider + ?Sized,
    {
        let mut stale = std::mem::take(&mut self.pending_removals);
        for id in self.index.objects() {
            match scene.object(id) {
                None => stale.push(id),
                Some(object) if self.indexed_revisions.get(&id) != Some(&object.revision()) => stale.push(id),
                Some(_) => {}
            }
        }
        if stale.is_empty() {
            return;
        }
        stale.sort_unstable();
        stale.dedup();

        self.index.remove_objects(&stale);
        let mut refreshed = Vec::with_capacity(stale.len());
        for &id in &stale {
            self.indexed_revisions.remove(&id);
            let Some(object) = scene.object(id) else {
                continue;
            };
            if self.is_excluded(id, object) {
                continue;
            }
            refreshed.push((id, object.world_bounds()));
            self.indexed_revisions.insert(id, object.revision());
        }
        self.index.add_objects(&refreshed);
        self.index.trim();

        log::debug!(
            "Reconciled spatial index: {} refreshed, {} dropped",
            refreshed.len(),
            stale.len() - refreshed.len()
        );
    }

    fn process_testers<S>(&mut self, scene: &S)
    where
        S: SceneProvider + ?Sized,
    {
        let player = scene.player_bounds();
        let Self {
            config,
            index,
            oracle,
            testers,
            direct,
            exclusion,
            events,
            candidates,
            sorted,
            pending_removals,
            ..
        } = self;

        let mut evaluated = 0usize;
        for (tester_id, tester) in testers.iter_mut() {
            if !tester.is_active() {
                record_exit(direct, events, tester_id);
                tester.mark_moved();
                continue;
            }
            if !tester.has_moved() {
                continue;
            }
            evaluated += 1;

            // Broad phase
            let tester_bounds = tester.world_bounds();
            let tester_center = tester_bounds.center();
            index.intersect_bounds(candidates, &tester_bounds);
            sorted.clear();
            for &id in candidates.iter() {
                let Some(object) = scene.object(id) else {
                    log::warn!("Candidate {id:?} was destroyed, scheduling index removal");
                    pending_removals.push(id);
                    continue;
                };
                if !admits(scene, exclusion.as_ref(), player, config.player_bounds_margin, id, object) {
                    continue;
                }
                let bounds = object.world_bounds();
                if !bounds.intersects(&tester_bounds) {
                    continue;
                }
                sorted.push(((bounds.center() - tester_center).norm_squared(), id));
            }

            if sorted.len() > config.max_tests_per_tester {
                log::warn!(
                    "Tester {tester_id:?} has {} candidates (ceiling {}), keeping previous result",
                    sorted.len(),
                    config.max_tests_per_tester
                );
                continue;
            }
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Narrow phase, closest bounds first
            let mut found = None;
            for &(_, id) in sorted.iter() {
                let Some(object) = scene.object(id) else {
                    continue;
                };
                if !geometry::configure_oracle(oracle, scene, id) {
                    log::trace!("Oracle could not bind {id:?}, treating as no hit");
                    continue;
                }
                if let Some(contact) =
                    geometry::test_object(oracle, object.transform(), tester, config.on_segment_tolerance)
                {
                    log::trace!("Tester {tester_id:?} hit {id:?} at {contact:?}");
                    found = Some((id, contact));
                    break;
                }
            }

            match found {
                Some((object, contact)) => record_hit(direct, events, tester_id, object, contact),
                None => record_exit(direct, events, tester_id),
            }
            tester.clear_moved();
        }

        log::debug!("Tester pass evaluated {evaluated} of {} testers", testers.len());
    }
}

pub(super) fn is_excluded(exclusion: Option<&ExclusionPredicate>, id: ObjectId, object: &SceneObject) -> bool {
    exclusion.is_some_and(|predicate| predicate(id, object))
}

/// Whether `bounds` completely encloses the player's bounds grown by `margin`
pub(super) fn encloses_player(player: Option<AABB>, margin: f32, bounds: &AABB) -> bool {
    player.is_some_and(|player| bounds.contains_aabb(&player.expanded(margin)))
}

/// Shared candidate filter: active, unlocked, not excluded, not a shell
/// around the player
pub(super) fn admits<S>(
    scene: &S,
    exclusion: Option<&ExclusionPredicate>,
    player: Option<AABB>,
    margin: f32,
    id: ObjectId,
    object: &SceneObject,
) -> bool
where
    S: SceneProvider + ?Sized,
{
    object.active
        && !object.locked
        && !scene.is_locked(id)
        && !is_excluded(exclusion, id, object)
        && !encloses_player(player, margin, &object.world_bounds())
}

fn record_hit(
    direct: &mut SecondaryMap<TesterId, DirectIntersection>,
    events: &mut Vec<IntersectionEvent>,
    tester: TesterId,
    object: ObjectId,
    contact: Vec3,
) {
    let Some(record) = direct.get_mut(tester) else {
        return;
    };

    if record.object == Some(object) {
        record.contact = contact;
        events.push(IntersectionEvent { tester, kind: IntersectionEventKind::Stay, object, contact });
        return;
    }

    if let Some(previous) = record.object {
        events.push(IntersectionEvent {
            tester,
            kind: IntersectionEventKind::Exit,
            object: previous,
            contact: record.contact,
        });
    }
    *record = DirectIntersection { object: Some(object), contact };
    events.push(IntersectionEvent { tester, kind: IntersectionEventKind::Enter, object, contact });
}

fn record_exit(
    direct: &mut SecondaryMap<TesterId, DirectIntersection>,
    events: &mut Vec<IntersectionEvent>,
    tester: TesterId,
) {
    let Some(record) = direct.get_mut(tester) else {
        return;
    };
    if let Some(previous) = record.object {
        events.push(IntersectionEvent {
            tester,
            kind: IntersectionEventKind::Exit,
            object: previous,
            contact: record.contact,
        });
    }
    *record = DirectIntersection::default();
}
