use std::collections::HashMap;

pub fn builtin_spells() -> HashMap<&'static str, &'static str> {
    HashMap::from([("basic", include_str!("../content/spells/basic.json"))])
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([(
        "goblin_ambush",
        include_str!("../content/encounters/goblin_ambush.json"),
    )])
}
