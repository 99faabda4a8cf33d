//! Position, heading and height integrator shared by the ball and players

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::{planar_direction, shortest_turn};

/// Kinematic state of one entity
///
/// `position.z` is the height above the pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionUnit {
    pub position: Vec3,
    /// Current heading (radians)
    pub facing_direction: f32,
    /// Desired heading the unit turns towards
    pub facing_target: f32,
    pub moving_speed: f32,
    /// Radians turned per unit of speed per second
    pub turn_rate: f32,
    /// Planar point the unit is travelling to, if any
    pub destination: Option<Vec2>,
}

impl MotionUnit {
    pub fn new(position: Vec3, turn_rate: f32) -> Self {
        Self {
            position,
            facing_direction: 0.0,
            facing_target: 0.0,
            moving_speed: 0.0,
            turn_rate,
            destination: None,
        }
    }

    #[inline]
    pub fn planar(&self) -> Vec2 {
        self.position.truncate()
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.position.z
    }

    #[inline]
    pub fn set_height(&mut self, height: f32) {
        self.position.z = height;
    }

    /// Heading from this unit towards `target`
    pub fn facing_angle(&self, target: Vec2) -> f32 {
        (target.y - self.position.y).atan2(target.x - self.position.x)
    }

    /// Point `distance` ahead along the desired heading, at the unit's height
    pub fn point_offset(&self, distance: f32) -> Vec3 {
        self.point_offset_at(distance, self.facing_target)
    }

    pub fn point_offset_at(&self, distance: f32, angle: f32) -> Vec3 {
        self.position + (planar_direction(angle) * distance).extend(0.0)
    }

    pub fn face(&mut self, angle: f32) {
        self.facing_target = angle;
    }

    pub fn face_point(&mut self, point: Vec2) {
        self.facing_target = self.facing_angle(point);
    }

    /// Head for `point`; planar motion continues until it is reached or [`stop`](Self::stop)
    pub fn move_to(&mut self, point: Vec2) {
        self.face_point(point);
        self.destination = Some(point);
    }

    pub fn stop(&mut self) {
        self.destination = None;
    }

    pub fn is_moving(&self) -> bool {
        self.destination.is_some()
    }

    /// Turn the current heading towards the desired one.
    /// The turn scales with speed, so a standing unit keeps its heading.
    pub fn rotate_towards_facing(&mut self, dt: f32) {
        let delta = shortest_turn(self.facing_direction, self.facing_target);
        let max_turn = self.turn_rate * self.moving_speed.max(0.0) * dt;
        let turn = delta.clamp(-max_turn, max_turn);
        self.facing_direction = crate::normalize_angle(self.facing_direction + turn);
    }

    /// Advance heading and planar position by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if let Some(destination) = self.destination {
            self.face_point(destination);
        }
        self.rotate_towards_facing(dt);

        let Some(destination) = self.destination else {
            return;
        };
        let travel = self.moving_speed.max(0.0) * dt;
        let remaining = destination.distance(self.planar());
        if remaining <= travel {
            self.position.x = destination.x;
            self.position.y = destination.y;
            self.destination = None;
        } else {
            let offset = planar_direction(self.facing_direction) * travel;
            self.position += offset.extend(0.0);
        }
    }

    /// Integrate one tick of a vertical arc. `vertical_speed` belongs to the
    /// caller; both the ball and players run the same formula with their own gravity.
    pub fn step_arc(&mut self, dt: f32, vertical_speed: &mut f32, gravity: f32) {
        self.position.z += 10.0 * *vertical_speed * dt;
        *vertical_speed -= 10.0 * gravity * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn unit_at_origin() -> MotionUnit {
        MotionUnit::new(Vec3::ZERO, 4.0 * PI)
    }

    #[test]
    fn test_facing_angle() {
        let unit = unit_at_origin();
        assert!((unit.facing_angle(Vec2::new(0.0, 2.0)) - FRAC_PI_2).abs() < 1e-6);
        assert!((unit.facing_angle(Vec2::new(-1.0, 0.0)) - PI).abs() < 1e-6);
    }

    #[test]
    fn test_point_offset_uses_target_heading() {
        let mut unit = unit_at_origin();
        unit.position.z = 0.5;
        unit.face(FRAC_PI_2);
        let p = unit.point_offset(0.6);
        assert!(p.x.abs() < 1e-6);
        assert!((p.y - 0.6).abs() < 1e-6);
        assert_eq!(p.z, 0.5);

        let q = unit.point_offset_at(1.0, 0.0);
        assert!((q.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_standing_unit_does_not_turn() {
        let mut unit = unit_at_origin();
        unit.face(FRAC_PI_2);
        unit.rotate_towards_facing(1.0);
        assert_eq!(unit.facing_direction, 0.0);
    }

    #[test]
    fn test_turn_scales_with_speed() {
        let mut slow = unit_at_origin();
        slow.moving_speed = 0.01;
        slow.face(FRAC_PI_2);
        slow.rotate_towards_facing(0.1);

        let mut fast = unit_at_origin();
        fast.moving_speed = 0.02;
        fast.face(FRAC_PI_2);
        fast.rotate_towards_facing(0.1);

        assert!(slow.facing_direction > 0.0);
        assert!((fast.facing_direction - 2.0 * slow.facing_direction).abs() < 1e-5);

        // Never overshoots the target
        fast.moving_speed = 100.0;
        fast.rotate_towards_facing(1.0);
        assert!((fast.facing_direction - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_step_moves_towards_destination_and_snaps() {
        let mut unit = unit_at_origin();
        unit.moving_speed = 1.0;
        unit.move_to(Vec2::new(1.0, 0.0));

        unit.step(0.25);
        assert!((unit.position.x - 0.25).abs() < 1e-6);
        assert!(unit.is_moving());

        for _ in 0..3 {
            unit.step(0.3);
        }
        assert_eq!(unit.planar(), Vec2::new(1.0, 0.0));
        assert!(!unit.is_moving());

        // Without a destination the unit stays put
        unit.step(1.0);
        assert_eq!(unit.planar(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_step_keeps_height() {
        let mut unit = unit_at_origin();
        unit.set_height(0.1);
        unit.moving_speed = 2.0;
        unit.move_to(Vec2::new(0.0, -5.0));
        unit.facing_direction = unit.facing_target;
        unit.step(0.5);
        assert!((unit.position.y + 1.0).abs() < 1e-5);
        assert_eq!(unit.height(), 0.1);
    }

    #[test]
    fn test_step_arc_rises_then_falls() {
        let mut unit = unit_at_origin();
        let mut vertical_speed = 1.0;
        unit.step_arc(0.1, &mut vertical_speed, 0.5);
        assert!((unit.height() - 1.0).abs() < 1e-6);
        assert!((vertical_speed - 0.5).abs() < 1e-6);

        unit.step_arc(0.1, &mut vertical_speed, 0.5);
        unit.step_arc(0.1, &mut vertical_speed, 0.5);
        assert!(vertical_speed < 0.0);
    }
}
