use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tech: TechConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tech: TechConfig::default(),
            routing: RoutingConfig::default(),
            input: InputConfig::default(),
        }
    }
}

/// Technology rules keyed by layer name, as written in the config file.
/// Resolved into [`crate::db::tech::Technology`] before routing.
#[derive(Debug, Deserialize, Clone)]
pub struct TechConfig {
    /// Routing layer name to allowed wire directions ("h", "v" or "hv").
    #[serde(default = "default_routing_layers")]
    pub routing_layers: BTreeMap<String, String>,
    #[serde(default = "default_via_layers")]
    pub via_layers: Vec<ViaLayerConfig>,
    /// Layers that only carry terminals or obstacles (diffusion, poly, labels).
    #[serde(default)]
    pub other_layers: Vec<String>,
    #[serde(default = "default_wire_width")]
    pub wire_width: BTreeMap<String, i64>,
    #[serde(default)]
    pub wire_width_horizontal: BTreeMap<String, i64>,
    #[serde(default = "default_via_size")]
    pub via_size: BTreeMap<String, i64>,
    #[serde(default = "default_via_weights")]
    pub via_weights: Vec<LayerPairValue<f64>>,
    #[serde(default)]
    pub multi_via: Vec<LayerPairValue<u32>>,
    #[serde(default = "default_weights")]
    pub weights_horizontal: BTreeMap<String, f64>,
    #[serde(default = "default_weights")]
    pub weights_vertical: BTreeMap<String, f64>,
    #[serde(default = "default_min_spacing")]
    pub min_spacing: Vec<LayerPairValue<i64>>,
    /// Minimum overlap of metal (`a`) around a via (`b`).
    #[serde(default = "default_minimum_enclosure")]
    pub minimum_enclosure: Vec<LayerPairValue<i64>>,
    #[serde(default = "default_pitch")]
    pub routing_grid_pitch_x: i64,
    #[serde(default = "default_pitch")]
    pub routing_grid_pitch_y: i64,
    #[serde(default = "default_grid_offset")]
    pub grid_offset_x: i64,
    #[serde(default = "default_grid_offset")]
    pub grid_offset_y: i64,
    #[serde(default = "default_pin_layer")]
    pub pin_layer: String,
    #[serde(default = "default_gate_length")]
    pub gate_length: i64,
}

impl Default for TechConfig {
    fn default() -> Self {
        Self {
            routing_layers: default_routing_layers(),
            via_layers: default_via_layers(),
            other_layers: Vec::new(),
            wire_width: default_wire_width(),
            wire_width_horizontal: BTreeMap::new(),
            via_size: default_via_size(),
            via_weights: default_via_weights(),
            multi_via: Vec::new(),
            weights_horizontal: default_weights(),
            weights_vertical: default_weights(),
            min_spacing: default_min_spacing(),
            minimum_enclosure: default_minimum_enclosure(),
            routing_grid_pitch_x: default_pitch(),
            routing_grid_pitch_y: default_pitch(),
            grid_offset_x: default_grid_offset(),
            grid_offset_y: default_grid_offset(),
            pin_layer: default_pin_layer(),
            gate_length: default_gate_length(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViaLayerConfig {
    pub bottom: String,
    pub top: String,
    pub via: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayerPairValue<T> {
    pub a: String,
    pub b: String,
    pub value: T,
}

impl<T> LayerPairValue<T> {
    pub fn new(a: &str, b: &str, value: T) -> Self {
        Self {
            a: a.to_string(),
            b: b.to_string(),
            value,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// Weight of the edges between a virtual terminal and its grid nodes.
    /// Must exceed the weight of any physical path in the grid.
    #[serde(default = "default_virtual_terminal_weight")]
    pub virtual_terminal_weight: f64,
    #[serde(default = "default_virtual_pin_weight")]
    pub virtual_pin_weight: f64,
    /// Extra pin edge weight per unit of distance from the vertical cell center.
    #[serde(default = "default_pin_center_weight")]
    pub pin_center_weight: f64,
    #[serde(default = "default_transistor_terminal_weight")]
    pub transistor_terminal_weight: f64,
    #[serde(default = "default_keep_out_margin")]
    pub keep_out_margin: i64,
    #[serde(default = "default_abutment_keep_out")]
    pub abutment_keep_out: bool,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_history_increment")]
    pub history_increment: f64,
    #[serde(default = "default_initial_penalty")]
    pub initial_penalty: f64,
    #[serde(default = "default_penalty_multiplier")]
    pub penalty_multiplier: f64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub debug_routing_graph: bool,
    #[serde(default = "default_debug_wire_width")]
    pub debug_wire_width: i64,
    #[serde(default = "default_debug_via_size")]
    pub debug_via_size: i64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            virtual_terminal_weight: default_virtual_terminal_weight(),
            virtual_pin_weight: default_virtual_pin_weight(),
            pin_center_weight: default_pin_center_weight(),
            transistor_terminal_weight: default_transistor_terminal_weight(),
            keep_out_margin: default_keep_out_margin(),
            abutment_keep_out: default_abutment_keep_out(),
            max_iterations: default_max_iterations(),
            history_increment: default_history_increment(),
            initial_penalty: default_initial_penalty(),
            penalty_multiplier: default_penalty_multiplier(),
            seed: 0,
            debug_routing_graph: false,
            debug_wire_width: default_debug_wire_width(),
            debug_via_size: default_debug_via_size(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub cell_files: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_write_images")]
    pub write_images: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            cell_files: Vec::new(),
            output_dir: default_output_dir(),
            write_images: default_write_images(),
        }
    }
}

fn default_routing_layers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("metal1".to_string(), "hv".to_string()),
        ("metal2".to_string(), "hv".to_string()),
    ])
}

fn default_via_layers() -> Vec<ViaLayerConfig> {
    vec![ViaLayerConfig {
        bottom: "metal1".to_string(),
        top: "metal2".to_string(),
        via: "via1".to_string(),
    }]
}

fn default_wire_width() -> BTreeMap<String, i64> {
    BTreeMap::from([("metal1".to_string(), 100), ("metal2".to_string(), 100)])
}

fn default_via_size() -> BTreeMap<String, i64> {
    BTreeMap::from([("via1".to_string(), 80)])
}

fn default_via_weights() -> Vec<LayerPairValue<f64>> {
    vec![LayerPairValue::new("metal1", "metal2", 400.0)]
}

fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([("metal1".to_string(), 1.0), ("metal2".to_string(), 1.0)])
}

fn default_min_spacing() -> Vec<LayerPairValue<i64>> {
    vec![
        LayerPairValue::new("metal1", "metal1", 100),
        LayerPairValue::new("metal2", "metal2", 100),
        LayerPairValue::new("via1", "via1", 100),
    ]
}

fn default_minimum_enclosure() -> Vec<LayerPairValue<i64>> {
    vec![
        LayerPairValue::new("metal1", "via1", 10),
        LayerPairValue::new("metal2", "via1", 10),
    ]
}

fn default_pitch() -> i64 {
    200
}

fn default_grid_offset() -> i64 {
    100
}

fn default_pin_layer() -> String {
    "metal2".to_string()
}

fn default_gate_length() -> i64 {
    50
}

fn default_virtual_terminal_weight() -> f64 {
    1e9
}

fn default_virtual_pin_weight() -> f64 {
    1e6
}

fn default_pin_center_weight() -> f64 {
    10.0
}

fn default_transistor_terminal_weight() -> f64 {
    1000.0
}

fn default_keep_out_margin() -> i64 {
    1000
}

fn default_abutment_keep_out() -> bool {
    true
}

fn default_max_iterations() -> usize {
    30
}

fn default_history_increment() -> f64 {
    50.0
}

fn default_initial_penalty() -> f64 {
    100.0
}

fn default_penalty_multiplier() -> f64 {
    1.5
}

fn default_debug_wire_width() -> i64 {
    2
}

fn default_debug_via_size() -> i64 {
    4
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_write_images() -> bool {
    true
}
