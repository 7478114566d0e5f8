//! Layered keymap.
//!
//! Two layers, base and shifted, each mapping buttons to an [`Action`].
//! The default layout:
//!
//! ```text
//!          base                          shifted
//! +-----------+-----------+-----------+  +-----------+-----------+-----------+
//! | 1 sleep   | 2 start/  | 3 Meetings|  | 1 sleep   | 2 start/  | 3 Admin   |
//! |   inhibit |   stop    |           |  |   inhibit |   stop    |           |
//! +-----------+-----------+-----------+  +-----------+-----------+-----------+
//! | 4 Project | 5 Project | 6 Project |  | 4 Project | 5 Project | 6 Project |
//! |   1       |   2       |   3       |  |   4       |   5       |   6       |
//! +-----------+-----------+-----------+  +-----------+-----------+-----------+
//! | 7 Support | 8 show    | 9 shift   |  | 7 Learning| 8 reset   | 9 shift   |
//! |           |   today   |           |  |           |   today   |           |
//! +-----------+-----------+-----------+  +-----------+-----------+-----------+
//! ```
//!
//! A keymap can also be loaded from JSON:
//!
//! ```json
//! {
//!   "base": {
//!     "2": { "action": "toggle_tracking" },
//!     "3": { "action": "start_project", "label": "Meetings", "color": [255, 0, 255] },
//!     "9": { "action": "shift_layer" }
//!   },
//!   "shifted": {
//!     "9": { "action": "shift_layer" }
//!   }
//! }
//! ```

use crate::error::{Result, TrackerError};
use keytally_core::{ButtonId, Layer, Rgb, validate_label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What a button does.
///
/// Variants without a payload are empty structs so that stray fields such as
/// `{"action": "show_today", "label": "x"}` are rejected when loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    /// Stop the running task, or start the default task when idle.
    ToggleTracking {},

    /// Switch to `label`, showing `color` on the project indicator.
    StartProject { label: String, color: Rgb },

    /// Print today's report.
    ShowToday {},

    /// Flip between base and shifted layer; a long press shuts down.
    ShiftLayer {},

    /// Toggle the sleep-prevention subprocess.
    ToggleSleepInhibit {},

    /// Move today's log aside and start over.
    ResetToday {},
}

impl Action {
    pub fn start_project(label: impl Into<String>, color: Rgb) -> Self {
        Self::StartProject {
            label: label.into(),
            color,
        }
    }
}

/// On-disk keymap shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeymapFile {
    base: BTreeMap<ButtonId, Action>,
    #[serde(default)]
    shifted: BTreeMap<ButtonId, Action>,
}

/// Validated two-layer keymap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    base: BTreeMap<ButtonId, Action>,
    shifted: BTreeMap<ButtonId, Action>,
}

impl Keymap {
    /// Build a keymap from its two layers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeymap` if a project label is not a valid task label,
    /// or if only one layer has a way to shift layers (which would trap the
    /// user in the other layer).
    pub fn new(
        base: BTreeMap<ButtonId, Action>,
        shifted: BTreeMap<ButtonId, Action>,
    ) -> Result<Self> {
        for (layer, actions) in [(Layer::Base, &base), (Layer::Shifted, &shifted)] {
            for (button, action) in actions {
                if let Action::StartProject { label, .. } = action {
                    validate_label(label).map_err(|e| {
                        TrackerError::invalid_keymap(format!("layer {layer}, button {button}: {e}"))
                    })?;
                }
            }
        }

        let has_shift = |actions: &BTreeMap<ButtonId, Action>| {
            actions.values().any(|a| matches!(a, Action::ShiftLayer {}))
        };
        if has_shift(&base) != has_shift(&shifted) {
            return Err(TrackerError::invalid_keymap(
                "shift_layer must be mapped in both layers or in neither",
            ));
        }

        Ok(Self { base, shifted })
    }

    /// Parse and validate a JSON keymap.
    ///
    /// # Errors
    ///
    /// Returns `KeymapFormat` for malformed JSON, unknown fields or actions,
    /// and buttons outside 1-9; otherwise as [`new`](Self::new).
    pub fn from_json(text: &str) -> Result<Self> {
        let file: KeymapFile = serde_json::from_str(text)?;
        Self::new(file.base, file.shifted)
    }

    /// Load a JSON keymap file.
    ///
    /// # Errors
    ///
    /// Returns `KeymapFile` if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| TrackerError::KeymapFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<String> {
        let file = KeymapFile {
            base: self.base.clone(),
            shifted: self.shifted.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Action bound to `button` in `layer`.
    pub fn action(&self, layer: Layer, button: ButtonId) -> Option<&Action> {
        self.layer(layer).get(&button)
    }

    pub fn layer(&self, layer: Layer) -> &BTreeMap<ButtonId, Action> {
        match layer {
            Layer::Base => &self.base,
            Layer::Shifted => &self.shifted,
        }
    }

    /// Color configured for `label`, searching the base layer first.
    pub fn project_color(&self, label: &str) -> Option<Rgb> {
        self.base
            .values()
            .chain(self.shifted.values())
            .find_map(|action| match action {
                Action::StartProject { label: l, color } if l == label => Some(*color),
                _ => None,
            })
    }
}

impl Default for Keymap {
    fn default() -> Self {
        let base = ButtonId::all()
            .zip([
                Action::ToggleSleepInhibit {},
                Action::ToggleTracking {},
                Action::start_project("Meetings", Rgb::new(255, 0, 255)),
                Action::start_project("Project 1", Rgb::new(0, 255, 255)),
                Action::start_project("Project 2", Rgb::new(255, 128, 0)),
                Action::start_project("Project 3", Rgb::new(128, 0, 255)),
                Action::start_project("Support", Rgb::RED),
                Action::ShowToday {},
                Action::ShiftLayer {},
            ])
            .collect();

        let shifted = ButtonId::all()
            .zip([
                Action::ToggleSleepInhibit {},
                Action::ToggleTracking {},
                Action::start_project("Admin", Rgb::new(255, 255, 255)),
                Action::start_project("Project 4", Rgb::new(0, 128, 255)),
                Action::start_project("Project 5", Rgb::new(255, 64, 128)),
                Action::start_project("Project 6", Rgb::new(128, 255, 0)),
                Action::start_project("Learning", Rgb::new(0, 255, 128)),
                Action::ResetToday {},
                Action::ShiftLayer {},
            ])
            .collect();

        Self { base, shifted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn b(id: u8) -> ButtonId {
        ButtonId::new(id).unwrap()
    }

    #[test]
    fn test_default_layout_is_valid() {
        let keymap = Keymap::default();
        let rebuilt = Keymap::new(keymap.base.clone(), keymap.shifted.clone()).unwrap();
        assert_eq!(rebuilt, keymap);

        for layer in [Layer::Base, Layer::Shifted] {
            assert_eq!(keymap.layer(layer).len(), 9);
            assert_eq!(keymap.action(layer, b(9)), Some(&Action::ShiftLayer {}));
        }
    }

    #[rstest]
    #[case(Layer::Base, 2, Action::ToggleTracking {})]
    #[case(Layer::Base, 8, Action::ShowToday {})]
    #[case(Layer::Shifted, 8, Action::ResetToday {})]
    #[case(Layer::Base, 1, Action::ToggleSleepInhibit {})]
    fn test_default_bindings(#[case] layer: Layer, #[case] button: u8, #[case] expected: Action) {
        assert_eq!(Keymap::default().action(layer, b(button)), Some(&expected));
    }

    #[test]
    fn test_project_color_lookup() {
        let keymap = Keymap::default();
        assert_eq!(keymap.project_color("Support"), Some(Rgb::RED));
        assert_eq!(
            keymap.project_color("Learning"),
            Some(Rgb::new(0, 255, 128))
        );
        assert_eq!(keymap.project_color("General"), None);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "base": {
                "2": { "action": "toggle_tracking" },
                "3": { "action": "start_project", "label": "Meetings", "color": [255, 0, 255] },
                "9": { "action": "shift_layer" }
            },
            "shifted": {
                "9": { "action": "shift_layer" },
                "8": { "action": "reset_today" }
            }
        }"#;

        let keymap = Keymap::from_json(json).unwrap();
        assert_eq!(
            keymap.action(Layer::Base, b(3)),
            Some(&Action::start_project("Meetings", Rgb::new(255, 0, 255)))
        );
        assert_eq!(keymap.action(Layer::Base, b(1)), None);
        assert_eq!(keymap.action(Layer::Shifted, b(8)), Some(&Action::ResetToday {}));
    }

    #[test]
    fn test_json_without_shifted_layer() {
        let json = r#"{ "base": { "5": { "action": "show_today" } } }"#;
        let keymap = Keymap::from_json(json).unwrap();
        assert!(keymap.layer(Layer::Shifted).is_empty());
    }

    #[rstest]
    #[case::unknown_action(r#"{ "base": { "1": { "action": "explode" } } }"#)]
    #[case::button_out_of_range(r#"{ "base": { "10": { "action": "show_today" } } }"#)]
    #[case::bad_color(r#"{ "base": { "1": { "action": "start_project", "label": "A", "color": [1, 2] } } }"#)]
    #[case::unknown_layer(r#"{ "base": {}, "third": {} }"#)]
    #[case::extra_field_on_plain_action(r#"{ "base": { "1": { "action": "show_today", "label": "x", "color": [1, 2, 3] } } }"#)]
    #[case::extra_field_on_shift(r#"{ "base": { "9": { "action": "shift_layer", "layer": 1 } }, "shifted": { "9": { "action": "shift_layer" } } }"#)]
    #[case::extra_field_on_project(r#"{ "base": { "1": { "action": "start_project", "label": "A", "color": [1, 2, 3], "icon": "x" } } }"#)]
    #[case::missing_color(r#"{ "base": { "1": { "action": "start_project", "label": "A" } } }"#)]
    fn test_from_json_rejects_format(#[case] json: &str) {
        assert!(matches!(
            Keymap::from_json(json),
            Err(TrackerError::KeymapFormat(_))
        ));
    }

    #[rstest]
    #[case::reserved_label(r#"{ "base": { "1": { "action": "start_project", "label": "STOP", "color": [1, 2, 3] } } }"#)]
    #[case::empty_label(r#"{ "base": { "1": { "action": "start_project", "label": " ", "color": [1, 2, 3] } } }"#)]
    #[case::one_sided_shift(r#"{ "base": { "9": { "action": "shift_layer" } } }"#)]
    fn test_from_json_rejects_invalid(#[case] json: &str) {
        assert!(matches!(
            Keymap::from_json(json),
            Err(TrackerError::InvalidKeymap(_))
        ));
    }

    #[test]
    fn test_plain_action_serializes_to_tag_only() {
        let json = serde_json::to_string(&Action::ShowToday {}).unwrap();
        assert_eq!(json, r#"{"action":"show_today"}"#);
    }

    #[test]
    fn test_json_round_trip_of_default() {
        let keymap = Keymap::default();
        let json = keymap.to_json().unwrap();
        assert_eq!(Keymap::from_json(&json).unwrap(), keymap);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Keymap::load(Path::new("/nonexistent/keymap.json")).unwrap_err();
        assert!(matches!(err, TrackerError::KeymapFile { .. }));
    }
}
