//! Property tests for collision predicates and the physics step.
//!
//! These tests use `proptest` to generate random geometry, forces and body
//! placements and verify that the engine's invariants hold after each step.

use gridrunner_physics::collide::{box_box, box_circle, circle_circle};
use gridrunner_physics::prelude::*;
use proptest::prelude::*;

/// Strategy that generates finite coordinates on a quarter-pixel lattice.
fn coord() -> impl Strategy<Value = f32> {
    (-4_000i32..4_000i32).prop_map(|v| v as f32 * 0.25)
}

fn extent() -> impl Strategy<Value = f32> {
    (1i32..400i32).prop_map(|v| v as f32 * 0.25)
}

fn rect() -> impl Strategy<Value = Rect> {
    (coord(), coord(), extent(), extent()).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn force() -> impl Strategy<Value = Vec2> {
    (-1_000_000i32..1_000_000i32, -1_000_000i32..1_000_000i32)
        .prop_map(|(x, y)| Vec2::new(x as f32, y as f32))
}

const LEVEL: &[&str] = &[
    "####################",
    "#..................#",
    "#..................#",
    "#..H...............#",
    "#..H.....^^....E...#",
    "####################",
];

fn level_engine() -> PhysicsEngine {
    let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
    engine.set_tile_layer(TileGrid::from_ascii(LEVEL, 16.0).unwrap());
    engine
}

fn actor(feet: Vec2) -> PhysicsBody {
    PhysicsBody::new(feet)
        .with_collider(Collider::new(Shape::rect(12.0, 24.0), Alignment::BottomCenter))
}

/// A contact on `side` is real only if a solid cell (or, under the feet, a
/// ladder top) sits right against that side of the bounds. The level has no
/// floating blocks, so a wall hit on the x pass is still adjacent after the
/// y pass.
fn solid_against(grid: &TileGrid, bounds: &Rect, side: Side) -> bool {
    let probe = match side {
        Side::Below => Rect::new(bounds.left() + 0.1, bounds.bottom() - 0.05, bounds.w - 0.2, 0.1),
        Side::Above => Rect::new(bounds.left() + 0.1, bounds.top() - 0.05, bounds.w - 0.2, 0.1),
        Side::Left => Rect::new(bounds.left() - 0.05, bounds.top() + 0.1, 0.1, bounds.h - 0.2),
        Side::Right => Rect::new(bounds.right() - 0.05, bounds.top() + 0.1, 0.1, bounds.h - 0.2),
    };
    match side {
        Side::Below => grid.floor_cells_in(&probe).next().is_some(),
        _ => grid.solid_cells_in(&probe).next().is_some(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn box_box_is_reflexive_and_symmetric(a in rect(), b in rect()) {
        prop_assert!(box_box(&a, &a));
        prop_assert_eq!(box_box(&a, &b), box_box(&b, &a));
    }

    #[test]
    fn circle_predicates_are_symmetric(
        ax in coord(), ay in coord(), ar in extent(),
        bx in coord(), by in coord(), br in extent(),
    ) {
        let (ca, cb) = (Vec2::new(ax, ay), Vec2::new(bx, by));
        prop_assert_eq!(circle_circle(ca, ar, cb, br), circle_circle(cb, br, ca, ar));
        prop_assert!(circle_circle(ca, ar, ca, ar));
    }

    #[test]
    fn box_circle_agrees_with_containment(r in rect(), cx in coord(), cy in coord()) {
        // A circle whose center lies inside the box always overlaps it.
        let center = Vec2::new(cx, cy);
        if r.contains_point(center) {
            prop_assert!(box_circle(&r, center, 0.0));
        }
    }

    #[test]
    fn speed_never_exceeds_max(f in force(), mass in 1i32..50, steps in 1usize..10) {
        let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
        let max = engine.config().max_speed;
        let h = engine.register_body(PhysicsBody::new(Vec2::ZERO).with_mass(mass as f32)).unwrap();
        for _ in 0..steps {
            engine.body_mut(h).unwrap().add_force(f);
            engine.advance(1.0 / 60.0);
            let v = engine.body(h).unwrap().velocity;
            prop_assert!(v.length() <= max * 1.0001, "speed {} > {}", v.length(), max);
        }
    }

    #[test]
    fn no_gravity_no_force_means_no_velocity_change(
        vx in -800i32..800, vy in -800i32..800, dt_ms in 0u32..100,
    ) {
        let mut engine = PhysicsEngine::new(PhysicsConfig::default()).unwrap();
        let v0 = Vec2::new(vx as f32 * 0.5, vy as f32 * 0.5);
        let h = engine
            .register_body(PhysicsBody::new(Vec2::ZERO).with_gravity(false).with_velocity(v0))
            .unwrap();
        engine.advance(dt_ms as f32 / 1000.0);
        prop_assert_eq!(engine.body(h).unwrap().velocity, v0);
    }

    #[test]
    fn contact_flags_are_never_stale(
        x in 40i32..280, y in 40i32..70,
        vx in -600i32..600, vy in -600i32..600,
        steps in 1usize..30,
    ) {
        let mut engine = level_engine();
        let h = engine
            .register_body(
                actor(Vec2::new(x as f32, y as f32))
                    .with_velocity(Vec2::new(vx as f32, vy as f32)),
            )
            .unwrap();
        for _ in 0..steps {
            engine.advance(1.0 / 60.0);
            let body = engine.body(h).unwrap();
            let bounds = body.bounds().unwrap();
            let grid = engine.tiles().unwrap();
            let flags = body.contacts();
            for side in [Side::Below, Side::Above, Side::Left, Side::Right] {
                if flags.get(side) {
                    prop_assert!(
                        solid_against(grid, &bounds, side),
                        "{:?} flagged with no solid against it at {:?}", side, bounds
                    );
                }
            }
        }
    }
}
