use crate::{
    Result,
    constants::{
        INDICATOR_COUNT, LAYER_INDICATOR, MAX_BUTTON, MIN_BUTTON, PROJECT_INDICATOR,
        SLEEP_INDICATOR, STOP_LABEL, TRACKING_INDICATOR,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Button number on the keypad (1-9).
///
/// Whether the number is the raw wiring position or the calibrated logical
/// position depends on the device; the tracking core treats both the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ButtonId(u8);

impl ButtonId {
    /// Create a new button id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidButton` if the id is outside 1-9.
    pub fn new(id: u8) -> Result<Self> {
        if !(MIN_BUTTON..=MAX_BUTTON).contains(&id) {
            return Err(Error::InvalidButton(u32::from(id)));
        }
        Ok(ButtonId(id))
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// All button ids in ascending order.
    pub fn all() -> impl Iterator<Item = ButtonId> {
        (MIN_BUTTON..=MAX_BUTTON).map(ButtonId)
    }
}

impl TryFrom<u8> for ButtonId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        ButtonId::new(value)
    }
}

impl From<ButtonId> for u8 {
    fn from(id: ButtonId) -> Self {
        id.0
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ButtonId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::NotANumber(s.to_string()))?;
        let id = u8::try_from(id).map_err(|_| Error::InvalidButton(id))?;
        ButtonId::new(id)
    }
}

/// How a button was pressed.
///
/// A long press is reported by the firmware once per hold, after the button
/// has been held for [`LONG_PRESS_SECS`](crate::constants::LONG_PRESS_SECS).
/// The initial edge of that same hold has already been reported as a
/// [`PressKind::Press`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressKind {
    Press,
    LongPress,
}

impl fmt::Display for PressKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Press => write!(f, "press"),
            Self::LongPress => write!(f, "long press"),
        }
    }
}

/// A decoded button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub kind: PressKind,
}

impl ButtonEvent {
    pub fn press(button: ButtonId) -> Self {
        Self {
            button,
            kind: PressKind::Press,
        }
    }

    pub fn long_press(button: ButtonId) -> Self {
        Self {
            button,
            kind: PressKind::LongPress,
        }
    }

    /// Same event, reported for another button.
    #[must_use]
    pub fn with_button(self, button: ButtonId) -> Self {
        Self { button, ..self }
    }
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "button {} {}", self.button, self.kind)
    }
}

/// Keymap layer, toggled by the shift action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Layer {
    #[default]
    Base,
    Shifted,
}

impl Layer {
    /// The other layer.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Base => Self::Shifted,
            Self::Shifted => Self::Base,
        }
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Base => 0,
            Self::Shifted => 1,
        }
    }
}

impl TryFrom<u8> for Layer {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Base),
            1 => Ok(Self::Shifted),
            other => Err(Error::InvalidLayer(other)),
        }
    }
}

impl From<Layer> for u8 {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::Base => 0,
            Layer::Shifted => 1,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Index of one indicator light (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct IndicatorIndex(u8);

impl IndicatorIndex {
    pub const SLEEP: IndicatorIndex = IndicatorIndex(SLEEP_INDICATOR);
    pub const TRACKING: IndicatorIndex = IndicatorIndex(TRACKING_INDICATOR);
    pub const PROJECT: IndicatorIndex = IndicatorIndex(PROJECT_INDICATOR);
    pub const LAYER: IndicatorIndex = IndicatorIndex(LAYER_INDICATOR);

    /// Create a new indicator index with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidIndicator` if the index is not below
    /// [`INDICATOR_COUNT`].
    pub fn new(index: u8) -> Result<Self> {
        if index >= INDICATOR_COUNT {
            return Err(Error::InvalidIndicator(u32::from(index)));
        }
        Ok(IndicatorIndex(index))
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for IndicatorIndex {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        IndicatorIndex::new(value)
    }
}

impl From<IndicatorIndex> for u8 {
    fn from(index: IndicatorIndex) -> Self {
        index.0
    }
}

impl fmt::Display for IndicatorIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RGB color of an indicator light.
///
/// Serialized as a `[r, g, b]` array and written on the wire as `r,g,b`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        [color.r, color.g, color.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut channels = s.split(',').map(|part| part.trim().parse::<u8>());
        match (
            channels.next(),
            channels.next(),
            channels.next(),
            channels.next(),
        ) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Ok(Rgb::new(r, g, b)),
            _ => Err(Error::InvalidColor(s.to_string())),
        }
    }
}

/// Check that `label` can be recorded as a task name.
///
/// A task label must be non-empty, fit on one line and must not collide with
/// the reserved [`STOP_LABEL`] sentinel.
///
/// # Errors
/// Returns `Error::InvalidLabel` describing the first violated rule.
pub fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::InvalidLabel("label must not be empty".to_string()));
    }
    if label.contains(['\n', '\r']) {
        return Err(Error::InvalidLabel(format!(
            "label must be a single line: {label:?}"
        )));
    }
    if label == STOP_LABEL {
        return Err(Error::InvalidLabel(format!(
            "{STOP_LABEL} is reserved for the end-of-task marker"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(9)]
    fn test_button_id_valid(#[case] id: u8) {
        assert_eq!(ButtonId::new(id).unwrap().as_u8(), id);
    }

    #[rstest]
    #[case(0)]
    #[case(10)]
    #[case(255)]
    fn test_button_id_invalid(#[case] id: u8) {
        assert_eq!(
            ButtonId::new(id).unwrap_err(),
            Error::InvalidButton(u32::from(id))
        );
    }

    #[rstest]
    #[case("3", 3)]
    #[case(" 9 ", 9)]
    fn test_button_id_from_str(#[case] input: &str, #[case] expected: u8) {
        let id: ButtonId = input.parse().unwrap();
        assert_eq!(id.as_u8(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("300")]
    #[case("x")]
    #[case("")]
    fn test_button_id_from_str_invalid(#[case] input: &str) {
        assert!(input.parse::<ButtonId>().is_err());
    }

    #[test]
    fn test_button_id_all() {
        let ids: Vec<u8> = ButtonId::all().map(u8::from).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_button_id_rejected_by_serde() {
        assert!(serde_json::from_str::<ButtonId>("12").is_err());
        assert_eq!(
            serde_json::from_str::<ButtonId>("4").unwrap(),
            ButtonId::new(4).unwrap()
        );
    }

    #[test]
    fn test_layer_toggle() {
        assert_eq!(Layer::Base.toggled(), Layer::Shifted);
        assert_eq!(Layer::Shifted.toggled(), Layer::Base);
        assert_eq!(Layer::default(), Layer::Base);
    }

    #[test]
    fn test_layer_from_u8() {
        assert_eq!(Layer::try_from(1).unwrap(), Layer::Shifted);
        assert_eq!(Layer::try_from(2).unwrap_err(), Error::InvalidLayer(2));
    }

    #[test]
    fn test_indicator_index_bounds() {
        assert!(IndicatorIndex::new(0).is_ok());
        assert!(IndicatorIndex::new(7).is_ok());
        assert!(IndicatorIndex::new(8).is_err());
    }

    #[rstest]
    #[case("0,255,0", Rgb::GREEN)]
    #[case("255, 255, 0", Rgb::YELLOW)]
    #[case("0,0,0", Rgb::OFF)]
    fn test_rgb_from_str(#[case] input: &str, #[case] expected: Rgb) {
        assert_eq!(input.parse::<Rgb>().unwrap(), expected);
    }

    #[rstest]
    #[case("0,255")]
    #[case("0,255,0,1")]
    #[case("256,0,0")]
    #[case("red")]
    fn test_rgb_from_str_invalid(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Rgb>(),
            Err(Error::InvalidColor(_))
        ));
    }

    #[test]
    fn test_rgb_display() {
        assert_eq!(Rgb::new(12, 0, 200).to_string(), "12,0,200");
    }

    #[test]
    fn test_rgb_serializes_as_array() {
        let json = serde_json::to_string(&Rgb::BLUE).unwrap();
        assert_eq!(json, "[0,0,255]");
        let color: Rgb = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(color, Rgb::new(1, 2, 3));
    }

    #[rstest]
    #[case("Project 1")]
    #[case("Support, 2nd level")]
    #[case("stop")]
    fn test_validate_label_accepts(#[case] label: &str) {
        assert!(validate_label(label).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("two\nlines")]
    #[case("STOP")]
    fn test_validate_label_rejects(#[case] label: &str) {
        assert!(matches!(validate_label(label), Err(Error::InvalidLabel(_))));
    }

    #[test]
    fn test_button_event_display() {
        let event = ButtonEvent::long_press(ButtonId::new(9).unwrap());
        assert_eq!(event.to_string(), "button 9 long press");
    }
}
