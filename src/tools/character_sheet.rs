//! Character sheet lookup tool

use super::ToolError;
use crate::sheets::SheetStore;
use serde::Deserialize;

pub const NAME: &str = "get_character_sheet";

/// Input for the sheet lookup tool
#[derive(Debug, Deserialize)]
pub struct SheetLookupInput {
    pub character_name: String,
}

/// Look up a character and return the serialized sheet
pub(crate) fn run(input: &SheetLookupInput, sheets: &dyn SheetStore) -> Result<String, ToolError> {
    let name = &input.character_name;
    match sheets.lookup(name) {
        Some(sheet) => serde_json::to_string_pretty(sheet)
            .map_err(|e| ToolError::Failed(format!("Could not serialize sheet for {name}: {e}"))),
        None => Err(ToolError::Failed(format!("Character {name} not found."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticSheets;
    use serde_json::Value;

    #[test]
    fn known_character_returns_full_sheet() {
        let sheets = StaticSheets::party();
        let input = SheetLookupInput {
            character_name: "Zauber Stab".to_string(),
        };

        let result = run(&input, &sheets).unwrap();
        let sheet: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(sheet["name"], "Zauber Stab");
        assert_eq!(sheet["classes"][0]["class_name"], "Barbarian");
        assert_eq!(sheet["strength"]["score"], 16);
    }

    #[test]
    fn unknown_character_is_an_error() {
        let sheets = StaticSheets::party();
        let input = SheetLookupInput {
            character_name: "Lord Soth".to_string(),
        };

        let err = run(&input, &sheets).unwrap_err();
        assert_eq!(err.to_string(), "Character Lord Soth not found.");
    }
}
