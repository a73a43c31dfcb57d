// =============================================================================
// Feature State Machine - Render States and Styles
// =============================================================================
//
// ```text
//                hover_enter            hover_leave
//   Default  ------------------> Hovered ----------> Default
//   Selected ------------------> HoveredSelected --> Selected
// ```
//
// Selection membership moves a feature between the two rows without touching
// the hover dimension. Style is a pure function of state.

use serde::Serialize;

/// Render state of one map feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureState {
    Default,
    Hovered,
    Selected,
    HoveredSelected,
}

impl FeatureState {
    /// Initial state from bucket-list membership
    pub fn initial(selected: bool) -> Self {
        if selected {
            FeatureState::Selected
        } else {
            FeatureState::Default
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, FeatureState::Selected | FeatureState::HoveredSelected)
    }

    pub fn is_hovered(&self) -> bool {
        matches!(self, FeatureState::Hovered | FeatureState::HoveredSelected)
    }

    pub fn on_hover_enter(self) -> Self {
        match self {
            FeatureState::Default => FeatureState::Hovered,
            FeatureState::Selected => FeatureState::HoveredSelected,
            other => other,
        }
    }

    pub fn on_hover_leave(self) -> Self {
        match self {
            FeatureState::Hovered => FeatureState::Default,
            FeatureState::HoveredSelected => FeatureState::Selected,
            other => other,
        }
    }

    /// Same hover dimension, new membership
    pub fn with_selected(self, selected: bool) -> Self {
        match (self.is_hovered(), selected) {
            (false, false) => FeatureState::Default,
            (false, true) => FeatureState::Selected,
            (true, false) => FeatureState::Hovered,
            (true, true) => FeatureState::HoveredSelected,
        }
    }

    pub fn style(&self) -> FeatureStyle {
        FeatureStyle::for_state(*self)
    }
}

impl std::fmt::Display for FeatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureState::Default => "default",
            FeatureState::Hovered => "hovered",
            FeatureState::Selected => "selected",
            FeatureState::HoveredSelected => "hovered+selected",
        };
        f.pad(name)
    }
}

// Palette
pub const STROKE_COLOR: &str = "#2b2b2b";
pub const STROKE_OPACITY: f32 = 0.9;
pub const STROKE_WEIGHT: f32 = 0.6;
pub const HOVER_STROKE_WEIGHT: f32 = 1.2;
pub const NEUTRAL_FILL: &str = "#74c0fc";
pub const NEUTRAL_FILL_OPACITY: f32 = 0.55;
pub const NEUTRAL_HOVER_FILL_OPACITY: f32 = 0.7;
pub const SELECTED_FILL: &str = "#f6ae2d";
pub const SELECTED_FILL_OPACITY: f32 = 0.8;
pub const SELECTED_HOVER_FILL_OPACITY: f32 = 0.9;

/// Path style handed to the map renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f32,
    pub stroke_color: &'static str,
    pub stroke_weight: f32,
    pub stroke_opacity: f32,
}

impl FeatureStyle {
    pub fn for_state(state: FeatureState) -> Self {
        let (fill_color, fill_opacity, stroke_weight) = match state {
            FeatureState::Default => (NEUTRAL_FILL, NEUTRAL_FILL_OPACITY, STROKE_WEIGHT),
            FeatureState::Hovered => (NEUTRAL_FILL, NEUTRAL_HOVER_FILL_OPACITY, HOVER_STROKE_WEIGHT),
            FeatureState::Selected => (SELECTED_FILL, SELECTED_FILL_OPACITY, STROKE_WEIGHT),
            FeatureState::HoveredSelected => (SELECTED_FILL, SELECTED_HOVER_FILL_OPACITY, HOVER_STROKE_WEIGHT),
        };
        Self {
            fill_color,
            fill_opacity,
            stroke_color: STROKE_COLOR,
            stroke_weight,
            stroke_opacity: STROKE_OPACITY,
        }
    }
}
