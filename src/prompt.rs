//! System prompt assembly
//!
//! Builds the system segments for a conversation participant: the fixed
//! persona prompt plus a character segment listing the party and, when the
//! name is recognized, the full character sheet. Pure and synchronous; an
//! unrecognized name still gets the party list.

use crate::llm::SystemContent;
use crate::sheets::SheetStore;

/// Base system prompt establishing the agent's persona
const BASE_PROMPT: &str = "You are the goddess Avandra, patron deity of luck and adventure. \
You help run a D&D 5e campaign by reading a character sheet and rolling dice.\
\n\n\
Before rolling dice, explain the relevant character stat and what dice you \
will roll, but don't describe the outcomes.";

/// Build the system prompt segments for the given character.
///
/// The character segment is flagged cacheable: it is the largest stable part
/// of the prompt and identical across every round trip of a conversation.
pub fn build_system_prompt(character_name: &str, sheets: &dyn SheetStore) -> Vec<SystemContent> {
    let party = serde_json::to_string(&sheets.names()).unwrap_or_else(|_| "[]".to_string());

    let character_segment = match sheets.lookup(character_name) {
        Some(sheet) => {
            let sheet_json = serde_json::to_string_pretty(sheet)
                .unwrap_or_else(|_| format!("(unavailable sheet for {character_name})"));
            format!(
                "The party members are: {party}\n\nHere is the player's character sheet:\n{sheet_json}"
            )
        }
        None => format!("The party members are: {party}"),
    };

    vec![
        SystemContent::new(BASE_PROMPT),
        SystemContent::cached(character_segment),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticSheets;

    #[test]
    fn recognized_character_gets_party_and_sheet() {
        let sheets = StaticSheets::party();
        let segments = build_system_prompt("Hoglat", &sheets);

        assert_eq!(segments.len(), 2);
        assert!(segments[0].text.contains("goddess Avandra"));
        assert!(!segments[0].cache);
        assert!(segments[1].text.contains("The party members are:"));
        assert!(segments[1].text.contains("\"Hoglat\""));
        assert!(segments[1].text.contains("character sheet"));
        assert!(segments[1].text.contains("\"class_name\": \"Cleric\""));
        assert!(segments[1].cache);
    }

    #[test]
    fn unrecognized_character_still_gets_party_list() {
        let sheets = StaticSheets::party();
        let segments = build_system_prompt("", &sheets);

        assert_eq!(segments.len(), 2);
        assert!(segments[1].text.contains("The party members are:"));
        assert!(segments[1].text.contains("\"Zauber Stab\""));
        assert!(!segments[1].text.contains("character sheet"));
    }

    #[test]
    fn assembly_is_idempotent() {
        let sheets = StaticSheets::party();
        let first = build_system_prompt("Vesper", &sheets);
        let second = build_system_prompt("Vesper", &sheets);
        assert_eq!(first, second);
    }
}
