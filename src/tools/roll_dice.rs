//! Dice rolling tool
//!
//! Rolls NdS, emits a human-readable breakdown on the side channel (the
//! "show work" message the user sees immediately), and returns the raw
//! rolls as JSON for the model.

use super::{SideChannel, ToolError};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

pub const NAME: &str = "roll_dice";

/// Input for the dice tool
#[derive(Debug, Deserialize)]
pub struct DiceRollInput {
    /// Number of sides on the die, at least 1
    pub sides: u32,
    /// Number of times to roll, at least 1
    #[serde(default = "default_times")]
    pub times: u32,
}

fn default_times() -> u32 {
    1
}

impl DiceRollInput {
    /// Standard dice notation, e.g. `2d20`
    fn notation(&self) -> String {
        format!("{}d{}", self.times, self.sides)
    }
}

/// Roll the dice, emitting the breakdown before returning the result
pub(crate) fn run(input: &DiceRollInput, emit: &SideChannel) -> Result<String, ToolError> {
    if input.sides < 1 {
        return Err(ToolError::Failed(
            "Number of sides must be at least 1.".to_string(),
        ));
    }
    if input.times < 1 {
        return Err(ToolError::Failed(
            "Number of rolls must be at least 1.".to_string(),
        ));
    }

    let mut rng = rand::thread_rng();
    let rolls: Vec<u32> = (0..input.times)
        .map(|_| rng.gen_range(1..=input.sides))
        .collect();

    let breakdown = rolls
        .iter()
        .map(|&value| emoji(input.sides, value))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = emit.send(format!("{} -> {breakdown}", input.notation()));

    Ok(json!({ "rolls": rolls }).to_string())
}

// Custom chat emoji for die faces. Dice without dedicated art fall back to
// the d20 faces (and the generic "1" face), anything over 20 sides renders
// as plain numbers.

const D4_FACES: [&str; 4] = [
    "<:d4_1:1361141389756203248>",
    "<:d4_2:1361141429585444976>",
    "<:d4_3:1361141445649629385>",
    "<:d4_4:1361141459910135858>",
];

const D6_FACES: [&str; 6] = [
    "<:d6_1:1361146264963645520>",
    "<:d6_2:1361147339661901964>",
    "<:d6_3:1361147351624061248>",
    "<:d6_4:1361147359915937792>",
    "<:d6_5:1361147368187236412>",
    "<:d6_6:1361147376131113080>",
];

const D20_FACES: [&str; 20] = [
    "<:d20_1:1356083355460042923>",
    "<:d20_2:1356088534494351414>",
    "<:d20_3:1356088583181697206>",
    "<:d20_4:1356089534906896424>",
    "<:d20_5:1356094275670114318>",
    "<:d20_6:1356104989075968180>",
    "<:d20_7:1356105384997158932>",
    "<:d20_8:1356106235384172564>",
    "<:d20_9:1356131184647868476>",
    "<:d20_10:1356131225592659988>",
    "<:d20_11:1356131251580440707>",
    "<:d20_12:1356131268164583424>",
    "<:d20_13:1356131281141764247>",
    "<:d20_14:1356131293594910932>",
    "<:d20_15:1356131307595370506>",
    "<:d20_16:1356131322225102878>",
    "<:d20_17:1356138165869740153>",
    "<:d20_18:1356138176569151508>",
    "<:d20_19:1356138185666854997>",
    "<:d20_20:1356138194634276981>",
];

/// Generic "1" face for dice that are not a d4, d6, or d20
const GENERIC_ONE: &str = "<:d_1:1361142075453735073>";

/// Emoji for a die face, or the plain value when no emoji exists
pub fn emoji(sides: u32, value: u32) -> String {
    if sides > 20 || value < 1 {
        return value.to_string();
    }

    let face = match (sides, value) {
        (4, 1..=4) => Some(D4_FACES[value as usize - 1]),
        (6, 1..=6) => Some(D6_FACES[value as usize - 1]),
        (4 | 6, _) => None,
        (20, 1) => Some(D20_FACES[0]),
        (_, 1) => Some(GENERIC_ONE),
        (_, 2..=20) => Some(D20_FACES[value as usize - 1]),
        _ => None,
    };

    face.map_or_else(|| value.to_string(), str::to_string)
}

/// Every die-face emoji in one string: d4 faces, d6 faces, the generic "1",
/// then the d20 faces. Debug/demo utility behind the `emojis` command.
pub fn emoji_catalog() -> String {
    let mut catalog = String::new();
    for value in 1..=4 {
        catalog.push_str(&emoji(4, value));
    }
    for value in 1..=6 {
        catalog.push_str(&emoji(6, value));
    }
    catalog.push_str(&emoji(19, 1));
    for value in 1..=20 {
        catalog.push_str(&emoji(20, value));
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn roll(input: &DiceRollInput) -> (Result<String, ToolError>, Vec<String>) {
        let (emit, mut emitted) = mpsc::unbounded_channel();
        let result = run(input, &emit);
        let mut fragments = Vec::new();
        while let Ok(fragment) = emitted.try_recv() {
            fragments.push(fragment);
        }
        (result, fragments)
    }

    proptest! {
        #[test]
        fn rolls_match_count_and_range(sides in 1u32..=100, times in 1u32..=40) {
            let (result, fragments) = roll(&DiceRollInput { sides, times });
            let payload: Value = serde_json::from_str(&result.unwrap()).unwrap();
            let rolls = payload["rolls"].as_array().unwrap();

            prop_assert_eq!(rolls.len() as u32, times);
            for value in rolls {
                let value = u32::try_from(value.as_u64().unwrap()).unwrap();
                prop_assert!((1..=sides).contains(&value));
            }
            prop_assert_eq!(fragments.len(), 1);
            let prefix = format!("{times}d{sides} ->");
            prop_assert!(fragments[0].starts_with(&prefix));
        }
    }

    #[test]
    fn times_defaults_to_one() {
        let input: DiceRollInput = serde_json::from_value(json!({"sides": 20})).unwrap();
        assert_eq!(input.times, 1);
        let (result, _) = roll(&input);
        let payload: Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(payload["rolls"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn zero_sides_is_rejected() {
        let (result, fragments) = roll(&DiceRollInput { sides: 0, times: 1 });
        assert!(matches!(result, Err(ToolError::Failed(_))));
        assert!(fragments.is_empty());
    }

    #[test]
    fn zero_times_is_rejected() {
        let (result, _) = roll(&DiceRollInput { sides: 6, times: 0 });
        assert!(matches!(result, Err(ToolError::Failed(_))));
    }

    #[test]
    fn emoji_falls_back_to_plain_numbers() {
        assert_eq!(emoji(100, 57), "57");
        assert_eq!(emoji(21, 1), "1");
        assert!(emoji(20, 20).contains("d20_20"));
        assert!(emoji(4, 3).contains("d4_3"));
        assert!(emoji(12, 1).contains("d_1"));
        assert!(emoji(12, 7).contains("d20_7"));
    }

    #[test]
    fn catalog_has_all_faces_in_order() {
        let catalog = emoji_catalog();
        assert!(catalog.starts_with("<:d4_1:"));
        assert!(catalog.contains("<:d_1:"));
        assert!(catalog.ends_with("<:d20_20:1356138194634276981>"));
        // 4 + 6 + 1 + 20 faces
        assert_eq!(catalog.matches("<:").count(), 31);
    }
}
