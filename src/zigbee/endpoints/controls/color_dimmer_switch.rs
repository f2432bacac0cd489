//! Color dimmer switch (HA device 0x0105).
//!
//! Binds On/Off, Level Control and Color Control of a light, then drives it
//! with level and color commands. Reading the light's color needs two
//! attributes (X and Y, or hue and saturation) that arrive as separate read
//! entries; the switch collects both before it reports a color.

use crate::error::{Result, ZigbeeError};
use crate::zigbee::binding::BindProfile;
use crate::zigbee::color::{Hsv, Rgb, hsv_to_rgb, rgb_to_xy, xy_to_rgb};
use crate::zigbee::device_types::DEV_TYPE_COLOR_DIMMER_SWITCH;
use crate::zigbee::endpoints::{EndpointCore, ReadSlot, ZigbeeEndpoint};
use crate::zigbee::messages::Attribute;
use crate::zigbee::stack::{CommandKind, CommandTarget, OnOffCommand};
use crate::zigbee::zcl::{ClusterList, ClusterRole, cluster, color_attrs, level_attrs, on_off_attrs};
use log::{debug, info, warn};
use parking_lot::Mutex;

const BOUND_CLUSTERS: [u16; 3] = [cluster::ON_OFF, cluster::LEVEL_CONTROL, cluster::COLOR_CONTROL];

/// Light state as last read back from a bound light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteLightState {
    pub on: bool,
    pub level: u8,
    pub rgb: Rgb,
}

#[derive(Debug, Default)]
struct ColorReadout {
    x: Option<u16>,
    y: Option<u16>,
    hue: Option<u8>,
    saturation: Option<u8>,
}

pub struct ColorDimmerSwitch {
    core: EndpointCore,
    remote: Mutex<RemoteLightState>,
    readout: Mutex<ColorReadout>,
    color: ReadSlot<Rgb>,
}

impl ColorDimmerSwitch {
    pub fn new(endpoint_id: u8) -> Self {
        let mut clusters = ClusterList::new()
            .with_cluster(cluster::BASIC, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Server)
            .with_cluster(cluster::IDENTIFY, ClusterRole::Client);
        for id in BOUND_CLUSTERS {
            clusters.add_cluster(id, ClusterRole::Client);
        }
        Self {
            core: EndpointCore::with_clusters(endpoint_id, DEV_TYPE_COLOR_DIMMER_SWITCH, clusters),
            remote: Mutex::new(RemoteLightState::default()),
            readout: Mutex::new(ColorReadout::default()),
            color: ReadSlot::new(),
        }
    }

    fn send(&self, kind: CommandKind) -> Result<()> {
        if !self.core.is_bound() {
            let endpoint = self.core.endpoint_id();
            warn!("[Zigbee] Switch {}: light not bound", endpoint);
            return Err(ZigbeeError::NotBound(endpoint));
        }
        self.core.send_command(CommandTarget::Bound, kind)
    }

    pub fn light_on(&self) -> Result<()> {
        self.send(CommandKind::OnOff(OnOffCommand::On))
    }

    pub fn light_off(&self) -> Result<()> {
        self.send(CommandKind::OnOff(OnOffCommand::Off))
    }

    pub fn light_toggle(&self) -> Result<()> {
        self.send(CommandKind::OnOff(OnOffCommand::Toggle))
    }

    pub fn set_light_level(&self, level: u8) -> Result<()> {
        info!("[Zigbee] Sending 'move to level {}' command", level);
        self.send(CommandKind::MoveToLevel {
            level,
            transition_time: 0,
        })
    }

    /// Move bound lights to `rgb` through the X/Y command.
    pub fn set_light_color(&self, rgb: Rgb) -> Result<()> {
        let (x, y) = rgb_to_xy(rgb);
        info!("[Zigbee] Sending 'move to color' x: {}, y: {}", x, y);
        self.send(CommandKind::MoveToColor {
            x,
            y,
            transition_time: 0,
        })
    }

    pub fn set_light_hue_saturation(&self, hue: u8, saturation: u8) -> Result<()> {
        self.send(CommandKind::MoveToHueAndSaturation {
            hue,
            saturation,
            transition_time: 0,
        })
    }

    /// Ask `target` for its on/off, level and color attributes. Results land
    /// in [`remote_state`](Self::remote_state).
    pub fn request_light_state(&self, target: CommandTarget) -> Result<()> {
        self.core
            .request_read(target, cluster::ON_OFF, vec![on_off_attrs::ON_OFF])?;
        let level = vec![level_attrs::CURRENT_LEVEL];
        self.core
            .request_read(target, cluster::LEVEL_CONTROL, level)?;
        self.request_color(target)
    }

    fn request_color(&self, target: CommandTarget) -> Result<()> {
        *self.readout.lock() = ColorReadout::default();
        self.core.request_read(
            target,
            cluster::COLOR_CONTROL,
            vec![color_attrs::CURRENT_X, color_attrs::CURRENT_Y],
        )
    }

    /// Read the color of `target`, waiting for both X and Y.
    pub async fn read_light_color(&self, target: CommandTarget) -> Result<Rgb> {
        let rx = self.color.arm();
        if let Err(e) = self.request_color(target) {
            self.color.disarm();
            return Err(e);
        }
        ReadSlot::wait(rx, self.core.read_timeout()).await
    }

    pub fn remote_state(&self) -> RemoteLightState {
        *self.remote.lock()
    }

    fn color_from_readout(&self, level: u8) -> Option<Rgb> {
        let mut readout = self.readout.lock();
        if let (Some(x), Some(y)) = (readout.x, readout.y) {
            readout.x = None;
            readout.y = None;
            return Some(xy_to_rgb(level, x, y));
        }
        if let (Some(h), Some(s)) = (readout.hue, readout.saturation) {
            readout.hue = None;
            readout.saturation = None;
            return Some(hsv_to_rgb(Hsv { h, s, v: level }));
        }
        None
    }

    fn on_color_attribute(&self, attribute: &Attribute) {
        {
            let mut readout = self.readout.lock();
            match attribute.id {
                color_attrs::CURRENT_X => readout.x = attribute.value.as_u16(),
                color_attrs::CURRENT_Y => readout.y = attribute.value.as_u16(),
                color_attrs::CURRENT_HUE => readout.hue = attribute.value.as_u8(),
                color_attrs::CURRENT_SATURATION => readout.saturation = attribute.value.as_u8(),
                other => {
                    debug!("[Zigbee] Ignoring color attribute 0x{:04x}", other);
                    return;
                }
            }
        }

        let level = self.remote.lock().level;
        if let Some(rgb) = self.color_from_readout(level) {
            debug!("[Zigbee] Bound light color {:?}", rgb);
            self.remote.lock().rgb = rgb;
            self.color.fulfil(rgb);
        }
    }
}

impl ZigbeeEndpoint for ColorDimmerSwitch {
    fn core(&self) -> &EndpointCore {
        &self.core
    }

    fn on_attribute_read(
        &self,
        cluster_id: u16,
        attribute: &Attribute,
        src_endpoint: u8,
        src_addr: u16,
    ) {
        match (cluster_id, attribute.id) {
            (cluster::ON_OFF, on_off_attrs::ON_OFF) => {
                if let Some(on) = attribute.value.as_bool() {
                    self.remote.lock().on = on;
                }
            }
            (cluster::LEVEL_CONTROL, level_attrs::CURRENT_LEVEL) => {
                if let Some(level) = attribute.value.as_u8() {
                    self.remote.lock().level = level;
                }
            }
            (cluster::COLOR_CONTROL, _) => self.on_color_attribute(attribute),
            _ => debug!(
                "[Zigbee] Switch {} ignoring 0x{:04x} of cluster 0x{:04x} from 0x{:04x}/{}",
                self.core.endpoint_id(),
                attribute.id,
                cluster_id,
                src_addr,
                src_endpoint
            ),
        }
    }

    fn bind_profile(&self) -> Option<BindProfile> {
        Some(BindProfile::client_of(&BOUND_CLUSTERS))
    }
}
