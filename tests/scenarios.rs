//! End-to-end scenarios driving the whole simulation through its public
//! boundary, the way the command layer would.

use arm_sandbox::gripper::GripEvent;
use arm_sandbox::motion::MotionState;
use arm_sandbox::physics::object::ShapeKind;
use arm_sandbox::simulation::Simulation;

const DT: f32 = 1.0 / 60.0;

/// Tick until the motion executor goes idle (or panic after `max` ticks).
fn settle_motion(sim: &mut Simulation, max: usize) {
    for _ in 0..max {
        let events = sim.tick(DT);
        assert!(
            events.collision_error.is_none(),
            "unexpected blocking: {:?}",
            events.collision_error
        );
        if !sim.motion.is_animating() {
            return;
        }
    }
    panic!("motion did not finish within {} ticks", max);
}

#[test]
fn pick_up_and_release_comes_to_rest_on_the_floor() {
    let mut sim = Simulation::new();

    // A 40 mm cube with its base on the floor: center at z = 2.
    let name = sim
        .spawn_object(ShapeKind::Cube, 100.0, 150.0, 0.0, 40.0)
        .unwrap();

    // Hover above, then descend so the cube sits between the open fingers.
    sim.move_to(100.0, 150.0, 60.0).unwrap();
    settle_motion(&mut sim, 600);
    sim.move_to(100.0, 150.0, 3.0).unwrap();
    settle_motion(&mut sim, 600);

    // Close: the cube must be gripped, not crushed.
    sim.set_gripper_openness(0.0, true);
    let mut gripped = false;
    for _ in 0..300 {
        let events = sim.tick(DT);
        if let Some(GripEvent::Gripped { object }) = events.grip_event {
            assert_eq!(object, name);
            gripped = true;
            break;
        }
    }
    assert!(gripped, "cube was never gripped");
    // Snug openness hugs the cube instead of closing to zero.
    assert!(sim.gripper.target_openness > 0.0);
    let idx = sim.world.find_by_name(&name).unwrap();
    // Exactly this object carries the attachment.
    assert_eq!(sim.world.gripped_object(), Some(idx));

    // Lift: the object must ride with the effector.
    sim.move_to(100.0, 150.0, 60.0).unwrap();
    settle_motion(&mut sim, 600);
    let carried = sim.world.objects[idx].position;
    assert!(
        carried.z > 20.0,
        "held object did not ride up with the gripper: z = {}",
        carried.z
    );

    // Open wide: release with a downward velocity seed, then free fall to
    // rest on the floor at half its size.
    let event = sim.set_gripper_openness(100.0, true);
    assert_eq!(event, Some(GripEvent::Released { object: name.clone() }));
    assert!(sim.world.objects[idx].velocity.z < 0.0);

    for _ in 0..400 {
        sim.tick(DT);
        let o = &sim.world.objects[idx];
        assert!(o.position.z >= o.half_size() - 0.05, "object sank below floor");
    }
    let rested = &sim.world.objects[idx];
    assert!(
        (rested.position.z - rested.half_size()).abs() < 0.1,
        "object did not come to rest on the floor: z = {}",
        rested.position.z
    );
    assert!((rested.position.x - 100.0).abs() < 10.0);
    assert!((rested.position.y - 150.0).abs() < 10.0);
}

#[test]
fn descending_onto_a_floor_cube_blocks_and_discards_the_queue() {
    let mut sim = Simulation::new();

    sim.spawn_object(ShapeKind::Cube, 0.0, 150.0, 0.0, 60.0).unwrap();

    // Fingers closed: a 6-unit cube cannot fit the gap, so the grip-zone
    // exemption does not apply during the descent.
    sim.set_gripper_openness(0.0, false);

    sim.move_to(0.0, 150.0, 40.0).unwrap();
    settle_motion(&mut sim, 600);

    sim.enqueue_command("pos 2".into());
    sim.move_to(0.0, 150.0, 1.0).unwrap();

    let mut blocked = None;
    for _ in 0..600 {
        let events = sim.tick(DT);
        if events.collision_error.is_some() {
            blocked = events.collision_error;
            break;
        }
        if !sim.motion.is_animating() {
            break;
        }
    }

    let error = blocked.expect("descent onto the cube must block");
    assert!(error.contains("cube_1"), "error names the obstacle: {}", error);
    assert!(matches!(sim.motion.state, MotionState::Blocked));
    assert!(sim.motion.queue.is_empty(), "queued commands must be discarded");

    // The cube is still on the floor, not tunneled through it.
    let idx = sim.world.find_by_name("cube_1").unwrap();
    let o = &sim.world.objects[idx];
    assert!(o.position.z >= o.half_size() - 0.05);

    // A fresh command leaves the Blocked state.
    sim.move_to(0.0, 150.0, 60.0).unwrap();
    settle_motion(&mut sim, 600);
    assert!(matches!(sim.motion.state, MotionState::Idle));
}

#[test]
fn sweeping_sideways_pushes_the_cube_instead_of_blocking() {
    let mut sim = Simulation::new();

    sim.spawn_object(ShapeKind::Cube, 0.0, 150.0, 0.0, 60.0).unwrap();
    sim.set_gripper_openness(0.0, false);

    // Park the tip beside the cube at its height, then sweep across.
    sim.move_to(25.0, 150.0, 4.0).unwrap();
    settle_motion(&mut sim, 600);

    let idx = sim.world.find_by_name("cube_1").unwrap();
    let before = sim.world.objects[idx].position;

    sim.move_to(-25.0, 150.0, 4.0).unwrap();
    let mut pushed = false;
    for _ in 0..600 {
        let events = sim.tick(DT);
        assert!(
            events.collision_error.is_none(),
            "horizontal contact must push, not block: {:?}",
            events.collision_error
        );
        let now = sim.world.objects[idx].position;
        if ((now.x - before.x).powi(2) + (now.y - before.y).powi(2)).sqrt() > 2.0 {
            pushed = true;
        }
        if !sim.motion.is_animating() {
            break;
        }
    }
    assert!(pushed, "cube was never pushed aside");

    let o = &sim.world.objects[idx];
    assert!(o.position.z >= o.half_size() - 0.05, "pushed cube stayed on the floor");
}

#[test]
fn stacked_spawns_rest_on_each_other_and_never_sink() {
    let mut sim = Simulation::new();

    sim.spawn_object(ShapeKind::Cube, 80.0, 120.0, 0.0, 50.0).unwrap();
    sim.spawn_object(ShapeKind::Cube, 80.0, 120.0, 0.0, 50.0).unwrap();
    sim.spawn_object(ShapeKind::Sphere, 80.0, 120.0, 0.0, 30.0).unwrap();

    for _ in 0..600 {
        sim.tick(DT);
        for (_, o) in sim.world.objects.iter() {
            assert!(
                o.position.z >= o.half_size() - 0.05,
                "{} sank below the floor",
                o.name
            );
        }
    }

    // The stack settled: everything slow, nothing interpenetrating deeply.
    for (_, o) in sim.world.objects.iter() {
        assert!(o.velocity.norm() < 10.0, "{} still moving fast", o.name);
    }
}

#[test]
fn stop_freezes_the_arm_and_clears_the_queue() {
    let mut sim = Simulation::new();

    sim.enqueue_command("never dispatched".into());
    sim.move_to(100.0, 150.0, 60.0).unwrap();
    for _ in 0..5 {
        sim.tick(DT);
    }
    assert!(sim.motion.is_animating());

    let mid = sim.arm.angles();
    sim.stop();
    assert!(sim.motion.queue.is_empty());
    assert!(!sim.motion.is_animating());

    for _ in 0..30 {
        sim.tick(DT);
    }
    assert_eq!(sim.arm.angles(), mid, "arm must stay frozen after stop");
}

#[test]
fn remove_all_objects_empties_the_scene() {
    let mut sim = Simulation::new();
    sim.spawn_object(ShapeKind::Cube, 100.0, 150.0, 0.0, 40.0).unwrap();
    sim.spawn_object(ShapeKind::Cylinder, -100.0, 150.0, 0.0, 40.0).unwrap();
    assert_eq!(sim.world.objects.len(), 2);
    sim.remove_all_objects();
    assert!(sim.world.objects.is_empty());
}
