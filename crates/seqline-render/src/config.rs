use seqline_core::SeqlineConfig;
use serde::{Deserialize, Serialize};

/// Where a straight arrow's label sits between its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelAlignment {
    Left,
    #[default]
    Center,
    Right,
}

pub const DEFAULT_THREAD_COLORS: [&str; 8] = [
    "#ffd8d8", "#d8ffd8", "#d8d8ff", "#ffffc8", "#ffd8ff", "#c8ffff", "#ffe4c4", "#e0e0e0",
];

/// Typed view of the `sequence.*` keys of a [`SeqlineConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub message_padding: f64,
    pub self_message_horizontal_space: f64,
    pub space_before_answer_to_self: f64,
    pub arrow_size: f64,
    pub return_arrow_visible: bool,
    pub opaque_message_text: bool,
    pub thread_colors: Vec<String>,
    pub threaded: bool,
    pub message_spacing: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    pub lifeline_spacing: f64,
    pub head_padding: f64,
    pub min_head_width: f64,
    pub head_gap: f64,
    pub activation_width: f64,
    pub destructor_size: f64,
    pub fragment_margin: f64,
    pub fragment_padding: f64,
    pub fragment_text_padding: f64,
    pub font_family: Option<String>,
    pub font_size: f64,
    pub label_alignment: LabelAlignment,
    pub wrap_labels: bool,
    pub implicit_lifelines: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::from_config(&SeqlineConfig::default())
    }
}

fn config_f64(cfg: &SeqlineConfig, key: &str, default: f64) -> f64 {
    cfg.get_f64(&format!("sequence.{key}"))
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .unwrap_or(default)
}

fn config_bool(cfg: &SeqlineConfig, key: &str, default: bool) -> bool {
    cfg.get_bool(&format!("sequence.{key}")).unwrap_or(default)
}

impl LayoutConfig {
    pub fn from_config(cfg: &SeqlineConfig) -> Self {
        let thread_colors = cfg
            .get("sequence.threadColors")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| c.as_str())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| DEFAULT_THREAD_COLORS.iter().map(|c| c.to_string()).collect());

        let label_alignment = match cfg.get_str("sequence.labelAlignment") {
            Some("left") => LabelAlignment::Left,
            Some("right") => LabelAlignment::Right,
            _ => LabelAlignment::Center,
        };

        Self {
            message_padding: config_f64(cfg, "messagePadding", 6.0),
            self_message_horizontal_space: config_f64(cfg, "selfMessageHorizontalSpace", 15.0),
            space_before_answer_to_self: config_f64(cfg, "spaceBeforeAnswerToSelf", 10.0),
            arrow_size: config_f64(cfg, "arrowSize", 6.0),
            return_arrow_visible: config_bool(cfg, "returnArrowVisible", true),
            opaque_message_text: config_bool(cfg, "opaqueMessageText", false),
            thread_colors,
            threaded: config_bool(cfg, "threaded", false),
            message_spacing: config_f64(cfg, "messageSpacing", 8.0),
            left_margin: config_f64(cfg, "leftMargin", 10.0),
            right_margin: config_f64(cfg, "rightMargin", 10.0),
            top_margin: config_f64(cfg, "topMargin", 10.0),
            bottom_margin: config_f64(cfg, "bottomMargin", 10.0),
            lifeline_spacing: config_f64(cfg, "lifelineSpacing", 20.0),
            head_padding: config_f64(cfg, "headPadding", 6.0),
            min_head_width: config_f64(cfg, "minHeadWidth", 40.0),
            head_gap: config_f64(cfg, "headGap", 8.0),
            activation_width: config_f64(cfg, "activationWidth", 8.0),
            destructor_size: config_f64(cfg, "destructorSize", 10.0),
            fragment_margin: config_f64(cfg, "fragmentMargin", 8.0),
            fragment_padding: config_f64(cfg, "fragmentPadding", 6.0),
            fragment_text_padding: config_f64(cfg, "fragmentTextPadding", 3.0),
            font_family: cfg.get_str("sequence.fontFamily").map(str::to_string),
            font_size: config_f64(cfg, "fontSize", 12.0).max(1.0),
            label_alignment,
            wrap_labels: config_bool(cfg, "wrapLabels", false),
            implicit_lifelines: config_bool(cfg, "implicitLifelines", false),
        }
    }

    /// Background colour for a thread, if the palette has any colours.
    pub fn thread_color(&self, thread: usize) -> Option<&str> {
        if self.thread_colors.is_empty() {
            return None;
        }
        Some(self.thread_colors[thread % self.thread_colors.len()].as_str())
    }
}
