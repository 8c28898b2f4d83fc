use approx::assert_relative_eq;

use super::{cube, cube_object, drain, engine, probe_at};
use crate::config::IntersectionConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::intersection::{IntersectionEngine, IntersectionEventKind, Tester};
use crate::physics::collision::Ray;
use crate::scene::{Mesh, Scene, SceneObject, AABB};
use std::sync::Arc;

#[test]
fn test_raycast_hits_floor_quad() {
    let mut scene = Scene::new();
    let floor = scene.spawn(SceneObject::with_mesh("floor", Transform::identity(), Arc::new(Mesh::quad(2.0))));
    let mut engine = engine();
    engine.setup(&scene);

    let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let hit = engine.raycast(&scene, &ray, 10.0, &[]).expect("floor should be hit");

    assert_eq!(hit.object, floor);
    assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
    assert_relative_eq!(hit.point, Vec3::zeros(), epsilon = 1e-5);
    assert_relative_eq!(hit.normal, Vec3::y(), epsilon = 1e-5);

    assert!(engine.raycast(&scene, &ray, 4.0, &[]).is_none());
    assert!(engine.raycast(&scene, &ray, 10.0, &[floor]).is_none());
}

#[test]
fn test_check_bounds_finds_enclosing_cube() {
    let mut scene = Scene::new();
    let unit = scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    let mut engine = engine();
    engine.setup(&scene);

    let probe = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.1));
    assert_eq!(engine.check_bounds(&scene, &probe, &[]), vec![unit]);
    assert!(engine.check_bounds(&scene, &probe, &[unit]).is_empty());
}

#[test]
fn test_check_sphere_finds_enclosing_cube() {
    let mut scene = Scene::new();
    let unit = scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    scene.spawn(cube_object("elsewhere", Vec3::new(4.0, 0.0, 0.0), 0.5));
    let mut engine = engine();
    engine.setup(&scene);

    assert_eq!(engine.check_sphere(&scene, Vec3::zeros(), 0.05, &[]), vec![unit]);
    assert!(!engine.oracle().is_posed());
}

#[test]
fn test_two_testers_keep_independent_records() {
    let mut scene = Scene::new();
    let o_mesh = cube(0.5);
    let p_mesh = cube(0.5);
    let o = scene.spawn(SceneObject::with_mesh("o", Transform::identity(), Arc::clone(&o_mesh)));
    let p = scene.spawn(SceneObject::with_mesh(
        "p",
        Transform::from_position(Vec3::new(3.0, 0.0, 0.0)),
        Arc::clone(&p_mesh),
    ));

    let mut engine = engine();
    engine.setup(&scene);
    let first = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));
    let second = engine.add_tester(probe_at(Vec3::new(3.1, 0.2, 0.05)));
    engine.tick(&scene);

    let (object, contact) = engine.intersected_object_for_tester(first).unwrap();
    assert_eq!(object, o);
    assert_relative_eq!(contact, Vec3::new(0.05, 0.15, 0.0), epsilon = 1e-5);

    let (object, contact) = engine.intersected_object_for_tester(second).unwrap();
    assert_eq!(object, p);
    assert_relative_eq!(contact, Vec3::new(3.05, 0.15, 0.0), epsilon = 1e-5);

    // The oracle keeps whatever was tested last
    assert!(engine.oracle().is_bound_to(&p_mesh));
    assert!(!engine.oracle().is_bound_to(&o_mesh));

    let events = drain(&mut engine);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event.kind == IntersectionEventKind::Enter));
}

#[test]
fn test_two_testers_inside_one_object_get_own_contacts() {
    let mut scene = Scene::new();
    let unit = scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    let mut engine = engine();
    engine.setup(&scene);

    let left = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));
    let right = engine.add_tester(probe_at(Vec3::new(-0.2, -0.1, 0.15)));
    let outside = engine.add_tester(probe_at(Vec3::new(3.1, 0.2, 0.05)));
    engine.tick(&scene);

    let (object, contact) = engine.intersected_object_for_tester(left).unwrap();
    assert_eq!(object, unit);
    assert_relative_eq!(contact, Vec3::new(0.05, 0.15, 0.0), epsilon = 1e-5);

    let (object, contact) = engine.intersected_object_for_tester(right).unwrap();
    assert_eq!(object, unit);
    assert_relative_eq!(contact, Vec3::new(-0.25, -0.15, 0.1), epsilon = 1e-5);

    assert!(engine.intersected_object_for_tester(outside).is_none());

    let events = drain(&mut engine);
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| event.kind == IntersectionEventKind::Enter && event.object == unit));
    assert!(events.iter().all(|event| event.tester != outside));
}

#[test]
fn test_undrained_events_are_capped() {
    let mut scene = Scene::new();
    let unit = scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    let config = IntersectionConfig { max_pending_events: 3, ..IntersectionConfig::default() };
    let mut engine = IntersectionEngine::with_octree(config).unwrap();
    engine.setup(&scene);
    let tester = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));

    // Enter, then a Stay for every tick the tester moves while touching
    for step in 0..6 {
        let offset = Vec3::new(0.01 * step as f32, 0.0, 0.0);
        engine
            .tester_mut(tester)
            .unwrap()
            .set_transform(Transform::from_position(Vec3::new(0.1, 0.2, 0.05) + offset));
        engine.tick(&scene);
    }

    let events = drain(&mut engine);
    assert_eq!(events.len(), 3);
    assert!(events
        .iter()
        .all(|event| event.kind == IntersectionEventKind::Stay && event.object == unit));
}

#[test]
fn test_candidate_ceiling_keeps_previous_record() {
    let anchor = Vec3::new(10.0, 0.0, 0.0);
    let probe_center = anchor + Vec3::new(0.1, 0.2, 0.05);

    let mut scene = Scene::new();
    let big = scene.spawn(cube_object("big", anchor, 0.5));
    let mut engine = engine();
    engine.setup(&scene);
    let tester = engine.add_tester(probe_at(probe_center));

    engine.tick(&scene);
    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, IntersectionEventKind::Enter);
    assert_eq!(events[0].object, big);

    // 300 tiny objects crowd the probe
    let mut clutter = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            for k in 0..3 {
                let offset = Vec3::new(
                    (i as f32 - 4.5) * 0.009,
                    (j as f32 - 4.5) * 0.009,
                    (k as f32 - 1.0) * 0.009,
                );
                let id = scene.spawn(cube_object("clutter", probe_center + offset, 0.005));
                assert!(engine.add_object(&scene, id));
                clutter.push(id);
            }
        }
    }

    let moved_center = probe_center + Vec3::new(0.001, 0.0, 0.0);
    engine.tester_mut(tester).unwrap().set_transform(Transform::from_position(moved_center));
    engine.tick(&scene);

    assert!(drain(&mut engine).is_empty());
    assert_eq!(engine.intersected_object_for_tester(tester).map(|(object, _)| object), Some(big));
    assert!(engine.tester(tester).unwrap().has_moved());

    for id in clutter {
        scene.destroy(id);
    }
    engine.tick(&scene);

    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, IntersectionEventKind::Stay);
    assert_eq!(events[0].object, big);
    assert!(!engine.tester(tester).unwrap().has_moved());
    assert_eq!(engine.index().len(), 1);
}

#[test]
fn test_stationary_tester_emits_nothing() {
    let mut scene = Scene::new();
    scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    let mut engine = engine();
    engine.setup(&scene);
    let tester = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));

    engine.tick(&scene);
    assert_eq!(drain(&mut engine).len(), 1);

    engine.tick(&scene);
    engine.tick(&scene);
    assert!(drain(&mut engine).is_empty());
    assert!(engine.intersected_object_for_tester(tester).is_some());
}

#[test]
fn test_moving_between_objects_exits_then_enters() {
    let mut scene = Scene::new();
    let o = scene.spawn(cube_object("o", Vec3::zeros(), 0.5));
    let p = scene.spawn(cube_object("p", Vec3::new(3.0, 0.0, 0.0), 0.5));
    let mut engine = engine();
    engine.setup(&scene);
    let tester = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));
    engine.tick(&scene);
    let entered_at = engine.intersected_object_for_tester(tester).unwrap().1;
    drain(&mut engine);

    engine
        .tester_mut(tester)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(3.1, 0.2, 0.05)));
    engine.tick(&scene);

    let events = drain(&mut engine);
    assert_eq!(events.len(), 2);
    assert_eq!((events[0].kind, events[0].object), (IntersectionEventKind::Exit, o));
    assert_relative_eq!(events[0].contact, entered_at);
    assert_eq!((events[1].kind, events[1].object), (IntersectionEventKind::Enter, p));

    engine
        .tester_mut(tester)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(1.5, 0.2, 0.05)));
    engine.tick(&scene);

    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].kind, events[0].object), (IntersectionEventKind::Exit, p));
    assert!(engine.intersected_object_for_tester(tester).is_none());
    assert_eq!(engine.direct_intersection(tester).unwrap().contact, Vec3::zeros());
}

#[test]
fn test_inactive_tester_exits_and_resumes() {
    let mut scene = Scene::new();
    let unit = scene.spawn(cube_object("unit", Vec3::zeros(), 0.5));
    let mut engine = engine();
    engine.setup(&scene);
    let tester = engine.add_tester(probe_at(Vec3::new(0.1, 0.2, 0.05)));
    engine.tick(&scene);
    drain(&mut engine);

    engine.tester_mut(tester).unwrap().hierarchy_active = false;
    engine.tick(&scene);
    engine.tick(&scene);
    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].kind, events[0].object), (IntersectionEventKind::Exit, unit));

    engine.tester_mut(tester).unwrap().hierarchy_active = true;
    engine.tick(&scene);
    let events = drain(&mut engine);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].kind, events[0].object), (IntersectionEventKind::Enter, unit));
}

#[test]
fn test_thin_tester_hits_through_edges() {
    let mut scene = Scene::new();
    let wall = scene.spawn(cube_object("wall", Vec3::zeros(), 0.5));
    let mut engine = engine();
    engine.setup(&scene);

    // A rod whose corners all sit outside the wall but whose length spans it
    let rod = Arc::new(Mesh::cube(Vec3::new(2.0, 0.01, 0.01)));
    let tester = Tester::new(Transform::from_position(Vec3::new(0.0, 0.13, 0.07)), rod).unwrap();
    let tester = engine.add_tester(tester);
    engine.tick(&scene);

    let (object, contact) = engine.intersected_object_for_tester(tester).unwrap();
    assert_eq!(object, wall);
    assert_relative_eq!(contact.x.abs(), 0.5, epsilon = 1e-5);
}
