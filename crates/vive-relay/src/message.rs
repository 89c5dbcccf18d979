use serde::{Deserialize, Serialize};

use crate::DeviceSample;

/// Reply body. Field order is part of the wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerMessage {
    pub valid: bool,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub vel_z: f64,
    pub device_name: String,
}

impl TrackerMessage {
    pub fn from_sample(device_name: impl Into<String>, s: &DeviceSample) -> Self {
        Self {
            valid: true,
            x: s.x,
            y: s.y,
            z: s.z,
            yaw: s.yaw,
            pitch: s.pitch,
            roll: s.roll,
            vel_x: s.vel_x,
            vel_y: s.vel_y,
            vel_z: s.vel_z,
            device_name: device_name.into(),
        }
    }

    /// Pretty JSON (2-space indent) terminated by `;`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push(';');
        Ok(json)
    }
}
