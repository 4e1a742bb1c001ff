//! Camera and light state, pushed to the engine as whole units.

use crate::color::Rgb;
use crate::engine::{DisplayEngine, LightParams};
use crate::settings::{LightSettings, Settings};
use glam::{DVec2, DVec3};

const PERSPECTIVE_MIN: f64 = 1.0;
const PERSPECTIVE_MAX: f64 = 100.0;

/// A value with engine-derived limits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounded {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    // --- User-controlled ---
    /// Eye position as fractions of the region extent.
    pub position: DVec2,
    pub perspective: f64,
    pub perspective_step: f64,
    pub twist: f64,
    pub background: Rgb,

    // --- Engine-derived ---
    pub height: Bounded,
    pub z_exag: Bounded,
    /// Point the camera looks at; `None` leaves the engine's own choice.
    pub focus: Option<DVec3>,
}

impl ViewState {
    pub fn from_settings(settings: &Settings) -> Self {
        let view = &settings.view;
        Self {
            position: DVec2::from(view.position),
            perspective: view.perspective,
            perspective_step: view.perspective_step,
            twist: view.twist,
            background: view.background,
            height: Bounded::default(),
            z_exag: Bounded { value: 1.0, min: 0.0, max: 10.0 },
            focus: None,
        }
    }
}

/// Light in UI units (z, brightness and ambient on 0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct LightState {
    pub position: DVec3,
    pub color: Rgb,
    pub brightness: f64,
    pub ambient: f64,
}

impl LightState {
    pub fn from_settings(light: &LightSettings) -> Self {
        Self {
            position: DVec3::from(light.position),
            color: light.color,
            brightness: light.brightness,
            ambient: light.ambient,
        }
    }

    /// Scales the UI ranges to the fractions the engine works with.
    pub fn to_engine(&self) -> LightParams {
        LightParams {
            position: [self.position.x, self.position.y, self.position.z / 100.0],
            color: self.color,
            brightness: self.brightness / 100.0,
            ambient: self.ambient / 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewController {
    pub view: ViewState,
    pub light: LightState,
}

impl ViewController {
    pub fn new(settings: &Settings) -> Self {
        Self {
            view: ViewState::from_settings(settings),
            light: LightState::from_settings(&settings.light),
        }
    }

    /// Pushes the camera. Z-exaggeration only goes out when `z_exag` is set;
    /// focus only when one is known.
    pub fn update_view<E: DisplayEngine>(&self, engine: &mut E, z_exag: bool) {
        let v = &self.view;
        engine.set_view(v.position.x, v.position.y, v.height.value, v.perspective, v.twist);

        if z_exag {
            engine.set_z_exag(v.z_exag.value);
        }
        if let Some(focus) = v.focus {
            engine.set_focus(focus.x, focus.y, focus.z);
        }
    }

    /// Restores engine defaults and the preferred camera, then re-centers.
    pub fn reset_view<E: DisplayEngine>(&mut self, engine: &mut E, settings: &Settings) {
        let defaults = engine.set_view_default();

        self.view.z_exag = Bounded {
            value: defaults.z_exag,
            min: 0.0,
            max: defaults.z_exag * 10.0,
        };
        self.view.height = Bounded {
            value: defaults.height,
            min: defaults.height_min,
            max: defaults.height_max,
        };

        self.view.position = DVec2::from(settings.view.position);
        self.view.perspective = settings.view.perspective;
        self.view.twist = settings.view.twist;

        // The engine decides where the center is.
        engine.look_at_center();
        self.view.focus = Some(DVec3::from(engine.focus()));

        tracing::debug!(
            z_exag = defaults.z_exag,
            height = defaults.height,
            "view reset to defaults"
        );
        self.update_view(engine, false);
    }

    /// Applies one mouse-wheel notch to the perspective. Returns `false`, with
    /// nothing pushed, when the clamped value does not change.
    pub fn adjust_perspective<E: DisplayEngine>(&mut self, engine: &mut E, wheel: i32) -> bool {
        if wheel == 0 {
            return false;
        }

        // Wheel up narrows the field of view.
        let delta = if wheel > 0 {
            -self.view.perspective_step
        } else {
            self.view.perspective_step
        };
        let prev = self.view.perspective;
        let next = (prev + delta).clamp(PERSPECTIVE_MIN, PERSPECTIVE_MAX);
        if next == prev {
            return false;
        }

        self.view.perspective = next;
        let v = &self.view;
        engine.set_view(v.position.x, v.position.y, v.height.value, v.perspective, v.twist);
        true
    }

    /// Moves the focus to the surface point under a screen position.
    pub fn look_here<E: DisplayEngine>(&mut self, engine: &mut E, x: i32, y: i32) {
        engine.look_here(x, y);
        self.view.focus = Some(DVec3::from(engine.focus()));
    }

    /// Pushes the whole light and redraws the lighting model.
    pub fn update_light<E: DisplayEngine>(&self, engine: &mut E) {
        engine.set_light(&self.light.to_engine());
        engine.draw_lighting_model();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RecordingEngine, ViewDefaults};

    #[test]
    fn test_perspective_clamps_and_skips_noop() {
        let mut engine = RecordingEngine::new();
        let mut ctl = ViewController::new(&Settings::default());
        ctl.view.perspective = 98.0;

        assert!(ctl.adjust_perspective(&mut engine, -120));
        assert_eq!(ctl.view.perspective, 100.0);
        assert_eq!(engine.count("set_view"), 1);

        for _ in 0..3 {
            assert!(!ctl.adjust_perspective(&mut engine, -120));
        }
        assert_eq!(engine.count("set_view"), 1);
    }

    #[test]
    fn test_perspective_stays_in_range() {
        let mut engine = RecordingEngine::new();
        let mut ctl = ViewController::new(&Settings::default());

        for wheel in [120, 120, 120, 120, 120, 120, 120, 120, 120, 120, -120, 0] {
            ctl.adjust_perspective(&mut engine, wheel);
            assert!((PERSPECTIVE_MIN..=PERSPECTIVE_MAX).contains(&ctl.view.perspective));
        }
        // 40 - 5*7 = 5, then 1, then +5.
        assert_eq!(ctl.view.perspective, 6.0);
    }

    #[test]
    fn test_reset_view_reads_engine_defaults_and_focus() {
        let mut engine = RecordingEngine::new()
            .with_view_defaults(ViewDefaults {
                z_exag: 2.0,
                height: 1500.0,
                height_min: 100.0,
                height_max: 9000.0,
            })
            .with_center([10.0, 20.0, 30.0]);
        let settings = Settings::default();
        let mut ctl = ViewController::new(&settings);
        ctl.view.perspective = 77.0;

        ctl.reset_view(&mut engine, &settings);

        assert_eq!(ctl.view.z_exag, Bounded { value: 2.0, min: 0.0, max: 20.0 });
        assert_eq!(ctl.view.height.max, 9000.0);
        assert_eq!(ctl.view.perspective, 40.0);
        assert_eq!(ctl.view.focus, Some(DVec3::new(10.0, 20.0, 30.0)));
        assert_eq!(
            engine.calls(),
            [
                "set_view_default()",
                "look_at_center()",
                "set_view(0.84, 0.16, 1500, 40, 0)",
                "set_focus(10, 20, 30)",
            ]
        );
    }

    #[test]
    fn test_update_view_skips_unset_focus() {
        let mut engine = RecordingEngine::new();
        let ctl = ViewController::new(&Settings::default());

        ctl.update_view(&mut engine, true);
        assert_eq!(engine.count("set_z_exag"), 1);
        assert_eq!(engine.count("set_focus"), 0);
    }

    #[test]
    fn test_light_is_scaled_for_engine() {
        let mut engine = RecordingEngine::new();
        let ctl = ViewController::new(&Settings::default());

        let params = ctl.light.to_engine();
        assert_eq!(params.position, [0.68, -0.68, 0.8]);
        assert_eq!(params.brightness, 0.8);
        assert_eq!(params.ambient, 0.2);

        ctl.update_light(&mut engine);
        assert_eq!(engine.count("set_light"), 1);
        assert_eq!(engine.calls().last().map(String::as_str), Some("draw_lighting_model()"));
    }
}
