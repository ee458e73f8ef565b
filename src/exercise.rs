use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CatalogError;

const IMAGE_BASE: &str = "https://raw.githubusercontent.com/alexanderbacca/Exercises/main";

/// One entry of the workout, in traversal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Display text, e.g. "12 Reps" or "30 Seconds"
    pub reps: String,
    /// Seconds; `None` means user-paced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub image_urls: Vec<String>,
}

impl Exercise {
    /// Timer length for timed exercises. A zero duration counts as untimed.
    pub fn timed_secs(&self) -> Option<u32> {
        self.duration.filter(|secs| *secs > 0)
    }

    pub fn is_timed(&self) -> bool {
        self.timed_secs().is_some()
    }
}

fn entry(id: &str, name: &str, description: &str, reps: &str, duration: Option<u32>) -> Exercise {
    // image files are named after the display name, minus any parenthesised alias
    let file = name.split(" (").next().unwrap_or(name).replace(' ', "%20");
    Exercise {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        reps: reps.to_string(),
        duration,
        image_urls: vec![format!("{IMAGE_BASE}/{file}.png")],
    }
}

/// The built-in routine
pub fn default_catalog() -> Vec<Exercise> {
    vec![
        entry(
            "squats",
            "Squats",
            "12-15 reps. Focus on deep, controlled form for muscle gain in legs/glutes. Variation: Add a jump at the top for endurance once easy.",
            "12-15 Reps",
            None,
        ),
        entry(
            "push-ups",
            "Push-ups",
            "12 reps. Standard; if too easy, slow the descent for more time under tension.",
            "12 Reps",
            None,
        ),
        entry(
            "mountain-climber",
            "Mountain climber",
            "30 seconds. Run in place vigorously; aim for 30 per side.",
            "30 Seconds",
            Some(30),
        ),
        entry(
            "reverse-dips",
            "Reverse Dips",
            "12 reps. Use a sturdy chair; great for triceps.",
            "12 Reps",
            None,
        ),
        entry(
            "high-knees",
            "High Knees",
            "30 seconds. Run in place vigorously; aim for 20-30 per side.",
            "30 Seconds",
            Some(30),
        ),
        entry(
            "planks",
            "Planks",
            "45 seconds. Engage core fully; builds spinal stability.",
            "45 Seconds",
            Some(45),
        ),
        entry(
            "crunches",
            "Crunches (Abdominales)",
            "15 reps. Focus on quality over speed.",
            "15 Reps",
            None,
        ),
        entry(
            "bicycle-crunches",
            "Bicycle Crunches",
            "12 reps per side. Twist fully for obliques.",
            "12 Reps/Side",
            None,
        ),
        entry(
            "elevated-pushups",
            "Elevated Leg Push-ups",
            "10-12 reps. Keep feet on a low step or chair; targets chest and shoulders.",
            "10-12 Reps",
            None,
        ),
    ]
}

/// Load a catalog from a JSON array of exercises.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<Exercise>, CatalogError> {
    let bytes = fs::read(path.as_ref())?;
    let exercises: Vec<Exercise> = serde_json::from_slice(&bytes)?;
    validate(&exercises)?;
    Ok(exercises)
}

fn validate(exercises: &[Exercise]) -> Result<(), CatalogError> {
    if exercises.is_empty() {
        return Err(CatalogError::Empty);
    }
    for (idx, ex) in exercises.iter().enumerate() {
        if ex.image_urls.is_empty() {
            return Err(CatalogError::MissingImage(ex.id.clone()));
        }
        if exercises[..idx].iter().any(|other| other.id == ex.id) {
            return Err(CatalogError::DuplicateId(ex.id.clone()));
        }
    }
    Ok(())
}
