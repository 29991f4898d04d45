//! Character sheet model and lookup
//!
//! The dataset is read-only after construction and safe to share across
//! concurrent conversations. It sits behind `SheetStore` so a real data
//! store can replace it without touching the conversation core.

use serde::Serialize;

/// A character's ability score
#[derive(Debug, Clone, Serialize)]
pub struct AbilityScore {
    pub score: u8,
    pub proficient: bool,
}

impl AbilityScore {
    fn new(score: u8) -> Self {
        Self {
            score,
            proficient: false,
        }
    }

    fn proficient(score: u8) -> Self {
        Self {
            score,
            proficient: true,
        }
    }
}

/// A character's class and its level
#[derive(Debug, Clone, Serialize)]
pub struct CharacterClass {
    pub class_name: String,
    pub level: u8,
}

impl CharacterClass {
    fn new(class_name: &str, level: u8) -> Self {
        Self {
            class_name: class_name.to_string(),
            level,
        }
    }
}

/// D&D 5e character sheet
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSheet {
    pub name: String,
    pub race: String,
    pub gender: String,
    pub total_character_level: u8,
    pub classes: Vec<CharacterClass>,
    pub strength: AbilityScore,
    pub dexterity: AbilityScore,
    pub constitution: AbilityScore,
    pub intelligence: AbilityScore,
    pub wisdom: AbilityScore,
    pub charisma: AbilityScore,
    pub skill_proficiencies: Vec<String>,
    pub weapon_proficiencies: Vec<String>,
    pub other: Vec<String>,
}

/// Read-only lookup for character sheets
pub trait SheetStore: Send + Sync {
    /// Find a sheet by exact character name
    fn lookup(&self, name: &str) -> Option<&CharacterSheet>;

    /// All character names, in party order
    fn names(&self) -> Vec<&str>;
}

/// In-memory sheet store for the current party
///
/// TODO: load from a database once the campaign outgrows a hardcoded party.
pub struct StaticSheets {
    sheets: Vec<CharacterSheet>,
}

impl StaticSheets {
    /// The current campaign's party
    pub fn party() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();

        Self {
            sheets: vec![
                CharacterSheet {
                    name: "Alistair Darrow".to_string(),
                    race: "Human".to_string(),
                    gender: "Male".to_string(),
                    total_character_level: 3,
                    classes: vec![CharacterClass::new("Wizard", 3)],
                    strength: AbilityScore::new(9),
                    dexterity: AbilityScore::new(13),
                    constitution: AbilityScore::new(11),
                    intelligence: AbilityScore::proficient(16),
                    wisdom: AbilityScore::proficient(14),
                    charisma: AbilityScore::new(15),
                    skill_proficiencies: strings(&[
                        "Arcana",
                        "Athletics",
                        "Insight",
                        "Investigation",
                    ]),
                    weapon_proficiencies: strings(&[
                        "Crossbow",
                        "Light Dagger",
                        "Quarterstaff",
                        "Sling",
                    ]),
                    other: vec![],
                },
                CharacterSheet {
                    name: "Hoglat".to_string(),
                    race: "Human".to_string(),
                    gender: "Male".to_string(),
                    total_character_level: 3,
                    classes: vec![CharacterClass::new("Cleric", 3)],
                    strength: AbilityScore::proficient(16),
                    dexterity: AbilityScore::new(12),
                    constitution: AbilityScore::new(15),
                    intelligence: AbilityScore::new(8),
                    wisdom: AbilityScore::proficient(14),
                    charisma: AbilityScore::new(10),
                    skill_proficiencies: strings(&[
                        "Acrobatics",
                        "Athletics (Expertise)",
                        "Insight",
                        "Intimidation",
                        "Medicine",
                    ]),
                    weapon_proficiencies: strings(&[
                        "Maul",
                        "Simple Weapons",
                        "Heavy Weapons",
                    ]),
                    other: vec![],
                },
                CharacterSheet {
                    name: "Vesper".to_string(),
                    race: "Stout Halfling".to_string(),
                    gender: "Male".to_string(),
                    total_character_level: 3,
                    classes: vec![CharacterClass::new("Bard", 3)],
                    strength: AbilityScore::new(10),
                    dexterity: AbilityScore::proficient(15),
                    constitution: AbilityScore::new(13),
                    intelligence: AbilityScore::new(14),
                    wisdom: AbilityScore::new(8),
                    charisma: AbilityScore::proficient(15),
                    skill_proficiencies: strings(&[
                        "Acrobatics",
                        "Deception",
                        "Insight (Expertise)",
                        "Performance (Expertise)",
                        "Persuasion",
                    ]),
                    weapon_proficiencies: strings(&[
                        "Crossbow",
                        "Hand",
                        "Longsword",
                        "Rapier",
                        "Shortsword",
                        "Simple Weapons",
                    ]),
                    other: strings(&[
                        "Advantage against being frightened",
                        "Advantage against poison",
                        "Jack of All Trades",
                    ]),
                },
                CharacterSheet {
                    name: "Zauber Stab".to_string(),
                    race: "Half-Orc".to_string(),
                    gender: "Male".to_string(),
                    total_character_level: 3,
                    classes: vec![CharacterClass::new("Barbarian", 3)],
                    strength: AbilityScore::proficient(16),
                    dexterity: AbilityScore::new(13),
                    constitution: AbilityScore::proficient(16),
                    intelligence: AbilityScore::new(10),
                    wisdom: AbilityScore::new(12),
                    charisma: AbilityScore::new(8),
                    skill_proficiencies: strings(&[
                        "Athletics",
                        "Intimidation",
                        "Survival",
                    ]),
                    weapon_proficiencies: strings(&[
                        "Martial Weapons",
                        "Simple Weapons",
                    ]),
                    other: strings(&[
                        "Advantage on DEX against effects that you can see while not blinded, deafened, or incapacitated.",
                        "+1 on all Arcana checks.",
                    ]),
                },
            ],
        }
    }
}

impl SheetStore for StaticSheets {
    fn lookup(&self, name: &str) -> Option<&CharacterSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
