use bevy::prelude::*;

/// Height above the character's base that the ground ray starts from
pub const GROUND_RAY_LIFT: f32 = 0.1;

/// Extra length added to the slope-derived ground ray
pub const GROUND_RAY_TOLERANCE: f32 = 0.05;

/// Steepest angle any slope setting may be clamped to (radians)
const MAX_ANGLE: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Character movement tuning values.
///
/// These are raw values; wrap them in a [`ControllerConfig`] to validate them
/// and compute the derived thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerSettings {
    /// Target horizontal speed in m/s at full input
    pub max_speed: f32,
    /// Gain of the velocity controller (1/s)
    pub acceleration: f32,
    /// Fraction of the movement force applied while airborne (0.0-1.0)
    pub air_speed_multiplier: f32,
    /// Upward velocity change applied by a jump (m/s)
    pub jump_force: f32,
    /// Distance from the ground to the top of the tallest climbable step
    pub step_height: f32,
    /// Minimum rise that counts as a step
    pub step_clearance: f32,
    /// Horizontal speed above which steps are attempted without input (m/s)
    pub step_speed_tolerance: f32,
    /// Steepest step top surface that can be climbed (radians)
    pub step_max_slope_angle: f32,
    /// Steepest slope that movement will follow (radians)
    pub max_slope_angle: f32,
    /// How far from vertical a contact normal may lean and still count as ground (0.0-1.0)
    pub slope_tolerance: f32,
    /// Maximum vertical catch-up speed of the visual root (m/s)
    pub camera_lerp_speed: f32,
    /// Body capsule radius
    pub radius: f32,
    /// Body capsule total height
    pub height: f32,
    /// Radius of the footprint that supports the character
    pub ground_radius: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            acceleration: 8.0,
            air_speed_multiplier: 0.75,
            jump_force: 6.0,
            step_height: 0.625,
            step_clearance: 0.15,
            step_speed_tolerance: 1.0,
            step_max_slope_angle: 30.0_f32.to_radians(),
            max_slope_angle: 45.0_f32.to_radians(),
            slope_tolerance: 0.5,
            camera_lerp_speed: 10.0,
            radius: 0.4,
            height: 1.8,
            ground_radius: 0.35,
        }
    }
}

impl ControllerSettings {
    /// Returns a copy with every value clamped into its valid range.
    pub fn validated(mut self) -> Self {
        self.max_speed = self.max_speed.max(0.0);
        self.acceleration = self.acceleration.max(0.0);
        self.air_speed_multiplier = self.air_speed_multiplier.clamp(0.0, 1.0);
        self.jump_force = self.jump_force.max(0.0);
        self.step_height = self.step_height.max(0.0);
        self.step_clearance = self.step_clearance.clamp(0.0, self.step_height);
        self.step_speed_tolerance = self.step_speed_tolerance.max(0.0);
        self.step_max_slope_angle = self.step_max_slope_angle.clamp(0.0, MAX_ANGLE);
        self.max_slope_angle = self.max_slope_angle.clamp(0.0, MAX_ANGLE);
        self.slope_tolerance = self.slope_tolerance.clamp(0.0, 1.0);
        self.camera_lerp_speed = self.camera_lerp_speed.max(0.0);
        self.radius = self.radius.max(0.01);
        self.height = self.height.max(self.radius * 2.0);
        self.ground_radius = self.ground_radius.clamp(0.0, self.radius);
        self
    }
}

/// Validated controller configuration with derived thresholds.
///
/// Derived values are recomputed whenever the settings change, so they can
/// never go stale.
#[derive(Component, Clone, Copy, Debug)]
pub struct ControllerConfig {
    settings: ControllerSettings,
    ground_ray_length: f32,
    max_slope_cos: f32,
    step_max_slope_cos: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

impl ControllerConfig {
    pub fn new(settings: ControllerSettings) -> Self {
        let mut config = Self {
            settings,
            ground_ray_length: 0.0,
            max_slope_cos: 1.0,
            step_max_slope_cos: 1.0,
        };
        config.set(settings);
        config
    }

    /// Replaces the settings, clamping them and recomputing derived values.
    pub fn set(&mut self, settings: ControllerSettings) {
        let validated = settings.validated();
        if validated != settings {
            warn!("controller settings out of range were clamped: {validated:?}");
        }

        self.settings = validated;
        self.max_slope_cos = validated.max_slope_angle.cos();
        self.step_max_slope_cos = validated.step_max_slope_angle.cos();

        // A character standing on the edge of its footprint on the steepest
        // walkable slope must still reach the ground.
        let edge_drop =
            validated.ground_radius / (90.0_f32.to_radians() - validated.max_slope_angle).sin();
        self.ground_ray_length = edge_drop + GROUND_RAY_TOLERANCE;
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Ray length below the character's base needed to find ground
    pub fn ground_ray_length(&self) -> f32 {
        self.ground_ray_length
    }

    /// Cosine of the steepest slope movement follows
    pub fn max_slope_cos(&self) -> f32 {
        self.max_slope_cos
    }

    /// Cosine of the steepest climbable step surface
    pub fn step_max_slope_cos(&self) -> f32 {
        self.step_max_slope_cos
    }

    pub fn half_height(&self) -> f32 {
        self.settings.height * 0.5
    }

    /// Converts a body center to the character's base (foot) position
    pub fn foot(&self, center: Vec3) -> Vec3 {
        center - Vec3::Y * self.half_height()
    }
}
