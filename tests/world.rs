use kart_physics::config::tux;
use kart_physics::kart_vehicle::WheelContactState;
use kart_physics::{KartControl, PhysicsWorld};

const DT: f32 = 1.0 / 60.0;

fn settled_world() -> (PhysicsWorld, usize) {
    let mut world = PhysicsWorld::new();
    let kart = world.spawn_kart(tux(), [0.0, 1.0, 0.0]).unwrap();
    for _ in 0..120 {
        world.step(DT);
    }
    (world, kart)
}

#[test]
fn kart_comes_to_rest_on_its_wheels() {
    let (world, kart) = settled_world();
    let vehicle = world.kart(kart).unwrap().vehicle();
    assert_eq!(vehicle.num_wheels_on_ground(), 4);
    assert!(vehicle.current_speed().abs() < 0.5);

    let chassis = world.chassis_state(kart).unwrap();
    let y = chassis.position().translation.vector.y;
    assert!(y > 0.2 && y < 1.5, "chassis height {y}");
    assert!(vehicle
        .wheels()
        .iter()
        .all(|w| w.contact_state() != WheelContactState::Airborne));
}

#[test]
fn throttle_moves_the_kart_forward() {
    let (mut world, kart) = settled_world();
    world.set_control(
        kart,
        KartControl {
            accel: 1.0,
            ..Default::default()
        },
    );
    for _ in 0..120 {
        world.step(DT);
    }
    let chassis = world.chassis_state(kart).unwrap();
    assert!(chassis.position().translation.vector.z > 1.0);
    assert!(world.kart(kart).unwrap().vehicle().current_speed() > 1.0);
}

#[test]
fn braking_slows_the_kart() {
    let (mut world, kart) = settled_world();
    world.set_control(kart, KartControl { accel: 1.0, ..Default::default() });
    for _ in 0..120 {
        world.step(DT);
    }
    let fast = world.kart(kart).unwrap().vehicle().current_speed();

    world.set_control(kart, KartControl { brake: 1.0, ..Default::default() });
    for _ in 0..30 {
        world.step(DT);
    }
    let slow = world.kart(kart).unwrap().vehicle().current_speed();
    assert!(slow < fast, "{slow} >= {fast}");
}

#[test]
fn rescue_sets_the_kart_upright_on_the_ground() {
    let (mut world, kart) = settled_world();
    let handle = world.kart(kart).unwrap().vehicle().chassis();
    {
        let body = &mut world.scene.bodies[handle];
        let mut pose = *body.position();
        pose.translation.vector.y = 4.0;
        pose.rotation = nalgebra::UnitQuaternion::from_euler_angles(2.5, 0.3, 0.0);
        body.set_position(pose, true);
    }

    assert!(world.project_kart_to_surface(kart, true).unwrap());

    let chassis = world.chassis_state(kart).unwrap();
    let up = chassis.position().rotation * nalgebra::Vector3::y();
    assert!((up.y - 1.0).abs() < 1.0e-3);
    assert_eq!(chassis.linvel(), nalgebra::Vector3::zeros());

    // Lowest wheel bottom touches y = 0.
    let vehicle = world.kart(kart).unwrap().vehicle();
    let lowest = vehicle
        .wheels()
        .iter()
        .map(|w| {
            let bottom = w.connection_point()
                + w.direction() * (w.suspension_rest_length() + w.radius());
            (chassis.position() * bottom).y
        })
        .fold(f32::INFINITY, f32::min);
    assert!(lowest.abs() < 1.0e-3, "lowest wheel at {lowest}");
}

#[test]
fn snapshots_and_overlay_cover_every_wheel() {
    let (world, _) = settled_world();
    let snapshot = world.snapshot();
    assert_eq!(snapshot.tick, 120);
    assert_eq!(snapshot.karts.len(), 1);
    assert_eq!(snapshot.karts[0].wheels.len(), 4);

    let overlay = world.debug_snapshot();
    assert_eq!(overlay.wheels.len(), 4);
    assert!(overlay.chassis.is_some());
}

#[test]
fn steering_right_turns_clockwise_seen_from_above() {
    let (mut world, kart) = settled_world();
    world.set_control(
        kart,
        KartControl {
            accel: 1.0,
            steer: 1.0,
            ..Default::default()
        },
    );
    for _ in 0..120 {
        world.step(DT);
    }
    let chassis = world.chassis_state(kart).unwrap();
    // Facing +Z with +Y up, the kart's right is -X.
    assert!(chassis.angvel().y < 0.0, "yaw rate {}", chassis.angvel().y);
    assert!(chassis.position().translation.vector.x < 0.0);
}

#[test]
fn timed_zipper_boosts_then_expires() {
    let (mut world, kart) = settled_world();
    world.kart_mut(kart).unwrap().handle_zipper(8.0, 0.5);
    for _ in 0..20 {
        world.step(DT);
    }
    let boosted = world.kart(kart).unwrap().vehicle();
    assert_eq!(boosted.zipper_speed(), Some(8.0));
    assert!(boosted.current_speed() > 4.0);

    for _ in 0..20 {
        world.step(DT);
    }
    assert_eq!(world.kart(kart).unwrap().vehicle().zipper_speed(), None);
}
