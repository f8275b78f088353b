use serde::{Deserialize, Serialize};
use tracing::info;

/// Trigger conditions of one captured frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTriggers {
    pub aec_exposure_time: f32,
    pub aec_exposure_gain_ratio: f32,
    pub aec_sensitivity: f32,
    pub aec_gain: f32,
    pub aec_lux_index: f32,
    pub awb_color_temperature: f32,
    pub drc_gain: f32,
    pub lens_position: f32,
    pub lens_zoom: f32,
    pub post_scale_ratio: f32,
    pub pre_scale_ratio: f32,
    pub total_scale_ratio: f32,
    pub sensor_image_width: u32,
    pub sensor_image_height: u32,
    pub number_of_led: u32,
    pub led_sensitivity: i32,
    pub led_first_entry_ratio: f32,
}

impl FrameTriggers {
    pub fn dump(&self) {
        info!(
            aec_exposure_time = self.aec_exposure_time,
            aec_exposure_gain_ratio = self.aec_exposure_gain_ratio,
            aec_sensitivity = self.aec_sensitivity,
            aec_gain = self.aec_gain,
            aec_lux_index = self.aec_lux_index,
            "AEC triggers"
        );
        info!(
            awb_color_temperature = self.awb_color_temperature,
            drc_gain = self.drc_gain,
            "AWB/DRC triggers"
        );
        info!(
            lens_position = self.lens_position,
            lens_zoom = self.lens_zoom,
            post_scale_ratio = self.post_scale_ratio,
            pre_scale_ratio = self.pre_scale_ratio,
            total_scale_ratio = self.total_scale_ratio,
            "Lens/scale triggers"
        );
        info!(
            sensor_image_width = self.sensor_image_width,
            sensor_image_height = self.sensor_image_height,
            number_of_led = self.number_of_led,
            led_sensitivity = self.led_sensitivity,
            led_first_entry_ratio = self.led_first_entry_ratio,
            "Sensor/LED triggers"
        );
    }
}
