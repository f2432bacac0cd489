//! Color dimmable light (HA device 0x0102).
//!
//! Tracks on/off, level and color from attribute writes made by remote
//! switches and reports every change through one callback with the
//! resulting RGB value.

use crate::error::Result;
use crate::zigbee::color::{Hsv, Rgb, hsv_to_rgb, rgb_to_hsv, rgb_to_xy, xy_to_rgb};
use crate::zigbee::device_types::DEV_TYPE_COLOR_DIMMABLE_LIGHT;
use crate::zigbee::endpoints::{EndpointCore, ZigbeeEndpoint};
use crate::zigbee::messages::Attribute;
use crate::zigbee::zcl::{
    AttributeValue, ClusterList, ClusterRole, cluster, color_attrs, level_attrs, on_off_attrs,
};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// ZCL color mode: current X/Y.
const COLOR_MODE_XY: u8 = 0x01;
/// Default white point, roughly D65.
const DEFAULT_X: u16 = 0x616B;
const DEFAULT_Y: u16 = 0x607D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightState {
    pub on: bool,
    pub level: u8,
    pub x: u16,
    pub y: u16,
    pub hue: u8,
    pub saturation: u8,
    pub rgb: Rgb,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            on: false,
            level: 255,
            x: DEFAULT_X,
            y: DEFAULT_Y,
            hue: 0,
            saturation: 0,
            rgb: xy_to_rgb(255, DEFAULT_X, DEFAULT_Y),
        }
    }
}

pub type LightChangeCallback = Arc<dyn Fn(LightState) + Send + Sync>;

pub struct ColorDimmableLight {
    core: EndpointCore,
    state: RwLock<LightState>,
    on_change: RwLock<Option<LightChangeCallback>>,
}

impl ColorDimmableLight {
    pub fn new(endpoint_id: u8) -> Self {
        let initial = LightState::default();
        let mut clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server)
            .with_cluster(cluster::GROUPS, ClusterRole::Server)
            .with_cluster(cluster::SCENES, ClusterRole::Server);
        clusters
            .set_attribute(
                cluster::ON_OFF,
                ClusterRole::Server,
                on_off_attrs::ON_OFF,
                AttributeValue::Bool(initial.on),
            )
            .set_attribute(
                cluster::LEVEL_CONTROL,
                ClusterRole::Server,
                level_attrs::CURRENT_LEVEL,
                AttributeValue::U8(initial.level),
            )
            .set_attribute(
                cluster::COLOR_CONTROL,
                ClusterRole::Server,
                color_attrs::CURRENT_X,
                AttributeValue::U16(initial.x),
            )
            .set_attribute(
                cluster::COLOR_CONTROL,
                ClusterRole::Server,
                color_attrs::CURRENT_Y,
                AttributeValue::U16(initial.y),
            )
            .set_attribute(
                cluster::COLOR_CONTROL,
                ClusterRole::Server,
                color_attrs::CURRENT_HUE,
                AttributeValue::U8(0),
            )
            .set_attribute(
                cluster::COLOR_CONTROL,
                ClusterRole::Server,
                color_attrs::CURRENT_SATURATION,
                AttributeValue::U8(0),
            )
            .set_attribute(
                cluster::COLOR_CONTROL,
                ClusterRole::Server,
                color_attrs::COLOR_MODE,
                AttributeValue::Enum8(COLOR_MODE_XY),
            );

        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_COLOR_DIMMABLE_LIGHT, clusters),
            state: RwLock::new(initial),
            on_change: RwLock::new(None),
        }
    }

    /// Called with the full light state after every change.
    pub fn on_light_change(&self, callback: impl Fn(LightState) + Send + Sync + 'static) {
        *self.on_change.write() = Some(Arc::new(callback));
    }

    pub fn state(&self) -> LightState {
        *self.state.read()
    }

    pub fn is_on(&self) -> bool {
        self.state.read().on
    }

    pub fn level(&self) -> u8 {
        self.state.read().level
    }

    pub fn rgb(&self) -> Rgb {
        self.state.read().rgb
    }

    fn notify(&self) {
        let state = self.state();
        let callback = self.on_change.read().clone();
        match callback {
            Some(cb) => cb(state),
            None => debug!(
                "[Zigbee] Light {} changed: on {}, level {}, rgb {:?}",
                self.core.endpoint_id(),
                state.on,
                state.level,
                state.rgb
            ),
        }
    }

    /// Switch the light locally and update the stack attribute.
    pub fn set_light_state(&self, on: bool) -> Result<()> {
        self.core.write_attribute(
            cluster::ON_OFF,
            ClusterRole::Server,
            on_off_attrs::ON_OFF,
            AttributeValue::Bool(on),
        )?;
        self.state.write().on = on;
        self.notify();
        Ok(())
    }

    pub fn set_light_level(&self, level: u8) -> Result<()> {
        self.core.write_attribute(
            cluster::LEVEL_CONTROL,
            ClusterRole::Server,
            level_attrs::CURRENT_LEVEL,
            AttributeValue::U8(level),
        )?;
        {
            let mut state = self.state.write();
            state.level = level;
            state.rgb = xy_to_rgb(level, state.x, state.y);
        }
        self.notify();
        Ok(())
    }

    /// Set the color from RGB; X/Y and hue/saturation follow.
    pub fn set_light_color(&self, rgb: Rgb) -> Result<()> {
        let (x, y) = rgb_to_xy(rgb);
        let hsv = rgb_to_hsv(rgb);
        for (attribute, value) in [
            (color_attrs::CURRENT_X, AttributeValue::U16(x)),
            (color_attrs::CURRENT_Y, AttributeValue::U16(y)),
            (color_attrs::CURRENT_HUE, AttributeValue::U8(hsv.h)),
            (color_attrs::CURRENT_SATURATION, AttributeValue::U8(hsv.s)),
        ] {
            let color = cluster::COLOR_CONTROL;
            self.core
                .write_attribute(color, ClusterRole::Server, attribute, value)?;
        }
        {
            let mut state = self.state.write();
            state.x = x;
            state.y = y;
            state.hue = hsv.h;
            state.saturation = hsv.s;
            state.rgb = rgb;
        }
        self.notify();
        Ok(())
    }

    fn apply_color(&self, attribute_id: u16, value: &AttributeValue) -> Option<bool> {
        let mut state = self.state.write();
        match attribute_id {
            color_attrs::CURRENT_X => {
                state.x = value.as_u16()?;
                state.rgb = xy_to_rgb(state.level, state.x, state.y);
            }
            color_attrs::CURRENT_Y => {
                state.y = value.as_u16()?;
                state.rgb = xy_to_rgb(state.level, state.x, state.y);
            }
            color_attrs::CURRENT_HUE => {
                state.hue = value.as_u8()?;
                state.rgb = hsv_to_rgb(Hsv {
                    h: state.hue,
                    s: state.saturation,
                    v: state.level,
                });
            }
            color_attrs::CURRENT_SATURATION => {
                state.saturation = value.as_u8()?;
                state.rgb = hsv_to_rgb(Hsv {
                    h: state.hue,
                    s: state.saturation,
                    v: state.level,
                });
            }
            other => {
                debug!("[Zigbee] Unhandled color attribute 0x{:04x}", other);
                return Some(false);
            }
        }
        Some(true)
    }
}

impl ZigbeeEndpoint for ColorDimmableLight {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn on_attribute_set(&self, cluster_id: u16, attribute: &Attribute) -> bool {
        let changed = match (cluster_id, attribute.id) {
            (cluster::ON_OFF, on_off_attrs::ON_OFF) => attribute.value.as_bool().map(|on| {
                info!(
                    "[Zigbee] Light {} turned {}",
                    self.core.endpoint_id(),
                    if on { "on" } else { "off" }
                );
                self.state.write().on = on;
                true
            }),
            (cluster::LEVEL_CONTROL, level_attrs::CURRENT_LEVEL) => {
                attribute.value.as_u8().map(|level| {
                    let mut state = self.state.write();
                    state.level = level;
                    state.rgb = xy_to_rgb(level, state.x, state.y);
                    true
                })
            }
            (cluster::COLOR_CONTROL, id) => self.apply_color(id, &attribute.value),
            (cluster_id, id) => {
                debug!(
                    "[Zigbee] Light {} ignoring attribute 0x{:04x} of cluster 0x{:04x}",
                    self.core.endpoint_id(),
                    id,
                    cluster_id
                );
                Some(false)
            }
        };

        match changed {
            Some(true) => {
                self.notify();
                true
            }
            Some(false) => true,
            None => {
                warn!(
                    "[Zigbee] Light {}: unexpected value {:?} for attribute 0x{:04x}",
                    self.core.endpoint_id(),
                    attribute.value,
                    attribute.id
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zigbee::test_support::RecordingStack;
    use crate::zigbee::endpoints::DEFAULT_READ_TIMEOUT;
    use parking_lot::Mutex;

    fn attr(id: u16, value: AttributeValue) -> Attribute {
        Attribute { id, value }
    }

    fn set_color(light: &ColorDimmableLight, id: u16, value: AttributeValue) -> bool {
        light.on_attribute_set(cluster::COLOR_CONTROL, &attr(id, value))
    }

    #[test]
    fn test_cluster_list_describes_light() {
        let light = ColorDimmableLight::new(10);
        let clusters = light.core().cluster_list().unwrap();
        assert!(clusters.has_cluster(cluster::ON_OFF, ClusterRole::Server));
        assert!(clusters.has_cluster(cluster::LEVEL_CONTROL, ClusterRole::Server));
        assert!(clusters.has_cluster(cluster::COLOR_CONTROL, ClusterRole::Server));
        assert!(light.core().is_configured());
        assert!(light.bind_profile().is_none());
    }

    #[test]
    fn test_attribute_writes_update_state_and_notify() {
        let light = ColorDimmableLight::new(10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        light.on_light_change(move |state| sink.lock().push(state));

        let on = attr(on_off_attrs::ON_OFF, AttributeValue::Bool(true));
        assert!(light.on_attribute_set(cluster::ON_OFF, &on));
        assert!(light.on_attribute_set(
            cluster::LEVEL_CONTROL,
            &attr(level_attrs::CURRENT_LEVEL, AttributeValue::U8(128)),
        ));
        assert!(light.is_on());
        assert_eq!(light.level(), 128);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_xy_write_recomputes_rgb() {
        let light = ColorDimmableLight::new(10);
        set_color(&light, color_attrs::CURRENT_X, AttributeValue::U16(45875));
        set_color(&light, color_attrs::CURRENT_Y, AttributeValue::U16(19660));
        let rgb = light.rgb();
        assert_eq!(rgb, xy_to_rgb(255, 45875, 19660));
        assert!(rgb.r > rgb.g && rgb.r > rgb.b);
    }

    #[test]
    fn test_hue_saturation_write_recomputes_rgb() {
        let light = ColorDimmableLight::new(10);
        set_color(
            &light,
            color_attrs::CURRENT_SATURATION,
            AttributeValue::U8(254),
        );
        set_color(&light, color_attrs::CURRENT_HUE, AttributeValue::U8(0));
        let expected = hsv_to_rgb(Hsv {
            h: 0,
            s: 254,
            v: 255,
        });
        assert_eq!(light.rgb(), expected);
    }

    #[test]
    fn test_wrong_type_rejected_unknown_accepted() {
        let light = ColorDimmableLight::new(10);
        let mistyped = attr(on_off_attrs::ON_OFF, AttributeValue::U16(1));
        assert!(!light.on_attribute_set(cluster::ON_OFF, &mistyped));
        assert!(light.on_attribute_set(cluster::SCENES, &attr(0x0000, AttributeValue::U8(1))));
        assert!(!light.is_on());
    }

    #[test]
    fn test_local_setters_write_stack() {
        let stack = RecordingStack::new();
        let light = ColorDimmableLight::new(10);
        light.core().attach(stack.handle(), DEFAULT_READ_TIMEOUT);

        light.set_light_state(true).unwrap();
        light.set_light_level(40).unwrap();
        light.set_light_color(Rgb::new(0, 0, 255)).unwrap();

        let stored = |cluster_id, id| stack.attribute(10, cluster_id, ClusterRole::Server, id);
        assert_eq!(
            stored(cluster::ON_OFF, on_off_attrs::ON_OFF),
            Some(AttributeValue::Bool(true))
        );
        assert_eq!(
            stored(cluster::LEVEL_CONTROL, level_attrs::CURRENT_LEVEL),
            Some(AttributeValue::U8(40))
        );
        let (x, y) = rgb_to_xy(Rgb::new(0, 0, 255));
        assert_eq!(
            stored(cluster::COLOR_CONTROL, color_attrs::CURRENT_X),
            Some(AttributeValue::U16(x))
        );
        assert_eq!(light.state().y, y);
        assert_eq!(light.rgb(), Rgb::new(0, 0, 255));
    }
}
