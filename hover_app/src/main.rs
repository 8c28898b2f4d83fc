//! Hover demo
//!
//! Headless walk-through of the intersection engine:
//! - A floor and a field of randomly placed crates
//! - A player body standing inside a room shell, which is ignored
//! - A hand tester sweeping across the field, logging Enter / Stay / Exit
//! - A pointer ray origin reporting the first crate it points at
//!
//! Pass a `.toml` or `.ron` path as the first argument to override the
//! engine configuration.

use std::sync::Arc;

use intersection_engine::foundation::logging;
use intersection_engine::prelude::*;
use rand::prelude::*;

// Scene layout
const NUM_CRATES: usize = 40;
const FIELD_HALF_SIZE: f32 = 6.0;
const CRATE_MIN_SIZE: f32 = 0.2;
const CRATE_MAX_SIZE: f32 = 0.6;
const ROOM_HALF_SIZE: f32 = 20.0;

// Hand sweep
const SWEEP_TICKS: usize = 240;
const HAND_HEIGHT: f32 = 0.3;
const HAND_SIZE: f32 = 0.05;

struct HoverDemoApp {
    scene: Scene,
    engine: IntersectionEngine,
    hand: TesterId,
    pointer: RayOriginId,
    crates: Vec<ObjectId>,
}

impl HoverDemoApp {
    fn new(config: IntersectionConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let mut scene = Scene::new();

        log::info!("Building demo scene...");
        scene.spawn(SceneObject::with_mesh("floor", Transform::identity(), Arc::new(Mesh::quad(ROOM_HALF_SIZE))));
        scene.spawn(SceneObject::with_mesh(
            "room",
            Transform::identity(),
            Arc::new(Mesh::cube(Vec3::repeat(ROOM_HALF_SIZE))),
        ));
        let body = scene.spawn(SceneObject::with_mesh(
            "player",
            Transform::from_position(Vec3::new(0.0, 0.9, 8.0)),
            Arc::new(Mesh::cube(Vec3::new(0.25, 0.9, 0.25))),
        ));
        scene.mark_player(body);

        let crate_mesh = Arc::new(Mesh::cube(Vec3::repeat(0.5)));
        let crates = (0..NUM_CRATES)
            .map(|i| {
                let size = rng.gen_range(CRATE_MIN_SIZE..CRATE_MAX_SIZE);
                let position = Vec3::new(
                    rng.gen_range(-FIELD_HALF_SIZE..FIELD_HALF_SIZE),
                    size * 0.5,
                    rng.gen_range(-FIELD_HALF_SIZE..FIELD_HALF_SIZE),
                );
                let yaw = Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..std::f32::consts::TAU));
                let transform = Transform::from_trs(position, yaw, Vec3::repeat(size));
                scene.spawn(SceneObject::with_mesh(format!("crate_{i}"), transform, Arc::clone(&crate_mesh)))
            })
            .collect();

        let mut engine = IntersectionEngine::with_octree(config)?;
        engine.set_exclusion_predicate(|_, object| object.name == "player");
        engine.setup(&scene);

        let hand = engine.add_tester(Tester::new(
            Transform::from_position(Vec3::new(-FIELD_HALF_SIZE, HAND_HEIGHT, 0.0)),
            Arc::new(Mesh::cube(Vec3::repeat(HAND_SIZE))),
        )?);
        let pointer = engine.add_ray_origin(Transform::from_position(Vec3::new(0.0, 1.5, 8.0)));

        Ok(Self { scene, engine, hand, pointer, crates })
    }

    fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut touches = 0usize;

        for tick in 0..SWEEP_TICKS {
            let t = tick as f32 / (SWEEP_TICKS - 1) as f32;
            let x = -FIELD_HALF_SIZE + 2.0 * FIELD_HALF_SIZE * t;
            let z = (t * std::f32::consts::TAU).sin() * FIELD_HALF_SIZE * 0.5;
            if let Some(hand) = self.engine.tester_mut(self.hand) {
                hand.set_transform(Transform::from_position(Vec3::new(x, HAND_HEIGHT, z)));
            }

            // Knock a crate over halfway through so reconciliation has work
            if tick == SWEEP_TICKS / 2 {
                if let Some(object) = self.crates.first().and_then(|&id| self.scene.get_mut(id)) {
                    let mut transform = *object.transform();
                    transform.position.y += 1.0;
                    object.set_transform(transform);
                }
            }

            self.engine.tick(&self.scene);
            for event in self.engine.drain_events() {
                let name = self.scene.get(event.object).map_or("<destroyed>", |object| object.name.as_str());
                match event.kind {
                    IntersectionEventKind::Enter => {
                        touches += 1;
                        log::info!("tick {tick}: hand entered {name} at {:?}", event.contact);
                    }
                    IntersectionEventKind::Exit => log::info!("tick {tick}: hand left {name}"),
                    IntersectionEventKind::Stay => log::trace!("tick {tick}: hand still on {name}"),
                }
            }

            let aim = Vec3::new(x, 0.0, z) - Vec3::new(0.0, 1.5, 8.0);
            let yaw = Quat::rotation_between(&-Vec3::z(), &aim).unwrap_or_else(Quat::identity);
            self.engine
                .set_ray_origin_pose(self.pointer, Transform::from_position_rotation(Vec3::new(0.0, 1.5, 8.0), yaw))?;
            self.engine.update_raycast(&self.scene, self.pointer, None);
            if tick % 60 == 0 {
                let (object, distance) = self.engine.first_object(self.pointer);
                let name = object
                    .and_then(|id| self.scene.get(id))
                    .map_or("nothing", |object| object.name.as_str());
                log::info!("tick {tick}: pointer on {name} ({distance:.2} m)");
            }
        }

        let near_floor = self
            .engine
            .check_sphere(&self.scene, Vec3::new(0.0, 0.05, 0.0), 1.0, &[]);
        log::info!("{} objects within 1 m of the field center", near_floor.len());
        log::info!("Hand touched {touches} crates over {SWEEP_TICKS} ticks");

        self.engine.shutdown();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            IntersectionConfig::load_from_file(&path)?
        }
        None => IntersectionConfig::default(),
    };

    println!("=== Hover Demo ===");
    println!("Set RUST_LOG=debug to see reconciliation and tester pass details");
    println!();

    let app = HoverDemoApp::new(config)?;
    app.run()
}
