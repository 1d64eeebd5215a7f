// tank_brain_core/brain/src/world/physics.rs
use crate::core::types::{Transform, Vec3};

/// Force/torque/impulse contract of the rigid-body engine that owns a combatant's hull.
///
/// Forces and torques are continuous (integrated over the engine's next step); impulses are
/// instantaneous. Values read back from the engine may be non-finite and callers must
/// sanitise them before use.
pub trait PhysicsBody {
    fn transform(&self) -> Transform;
    fn linear_velocity(&self) -> Vec3;
    fn angular_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn set_angular_velocity(&mut self, velocity: Vec3);
    fn mass(&self) -> f32;
    fn apply_force(&mut self, force: Vec3, at: Vec3);
    fn apply_impulse(&mut self, impulse: Vec3, at: Vec3);
    fn apply_torque(&mut self, torque: Vec3);

    /// True once the engine has torn the body down; every dependent read is skipped.
    fn is_disposed(&self) -> bool {
        false
    }
}

impl<B: PhysicsBody + ?Sized> PhysicsBody for Box<B> {
    fn transform(&self) -> Transform {
        (**self).transform()
    }
    fn linear_velocity(&self) -> Vec3 {
        (**self).linear_velocity()
    }
    fn angular_velocity(&self) -> Vec3 {
        (**self).angular_velocity()
    }
    fn set_linear_velocity(&mut self, velocity: Vec3) {
        (**self).set_linear_velocity(velocity)
    }
    fn set_angular_velocity(&mut self, velocity: Vec3) {
        (**self).set_angular_velocity(velocity)
    }
    fn mass(&self) -> f32 {
        (**self).mass()
    }
    fn apply_force(&mut self, force: Vec3, at: Vec3) {
        (**self).apply_force(force, at)
    }
    fn apply_impulse(&mut self, impulse: Vec3, at: Vec3) {
        (**self).apply_impulse(impulse, at)
    }
    fn apply_torque(&mut self, torque: Vec3) {
        (**self).apply_torque(torque)
    }
    fn is_disposed(&self) -> bool {
        (**self).is_disposed()
    }
}
