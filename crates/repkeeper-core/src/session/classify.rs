//! Keyword classification of exercises into cardio / bodyweight / loaded.
//!
//! Matching is done on whole words so that e.g. "crunch" never matches the
//! cardio keyword "run".

const CARDIO_KEYWORDS: &[&str] = &[
    "run",
    "running",
    "jog",
    "jogging",
    "treadmill",
    "bike",
    "biking",
    "cycling",
    "cycle",
    "spin",
    "rowing",
    "rower",
    "erg",
    "elliptical",
    "stair climber",
    "stairmaster",
    "jump rope",
    "skipping",
    "swim",
    "swimming",
    "walk",
    "walking",
    "hike",
    "hiit",
    "sprint",
    "sprints",
    "cardio",
];

const BODYWEIGHT_KEYWORDS: &[&str] = &[
    "push up",
    "pushup",
    "pushups",
    "pull up",
    "pullup",
    "pullups",
    "chin up",
    "chinup",
    "chinups",
    "dip",
    "dips",
    "plank",
    "burpee",
    "burpees",
    "sit up",
    "situp",
    "situps",
    "crunch",
    "crunches",
    "mountain climber",
    "mountain climbers",
    "air squat",
    "pistol squat",
    "muscle up",
    "hanging leg raise",
    "bodyweight",
];

const BODYWEIGHT_EQUIPMENT: &[&str] = &["bodyweight", "body weight", "none"];

/// Which fields of a set are meaningful for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    /// Weight and reps.
    Loaded,
    /// Reps only; weight is optional extra load.
    Bodyweight,
    /// Duration only.
    Cardio,
}

/// Classify an exercise from its name, equipment and category text.
pub fn classify(name: &str, equipment: Option<&str>, category: Option<&str>) -> ExerciseKind {
    let name_words = words(name);
    let equipment_words = equipment.map(words).unwrap_or_default();
    let category_words = category.map(words).unwrap_or_default();

    let is_cardio = [&name_words, &equipment_words, &category_words]
        .iter()
        .any(|w| CARDIO_KEYWORDS.iter().any(|k| contains_phrase(w, k)));
    if is_cardio {
        return ExerciseKind::Cardio;
    }

    let bodyweight_name = BODYWEIGHT_KEYWORDS
        .iter()
        .any(|k| contains_phrase(&name_words, k));
    let bodyweight_equipment = BODYWEIGHT_EQUIPMENT
        .iter()
        .any(|k| contains_phrase(&equipment_words, k));
    if bodyweight_name || bodyweight_equipment {
        ExerciseKind::Bodyweight
    } else {
        ExerciseKind::Loaded
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}
