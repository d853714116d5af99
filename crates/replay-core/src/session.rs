//! Session metadata
//!
//! The shape of one training session as stored by the dashboard's data layer.
//! Only the fields the replay pipeline needs are modelled.

use crate::recording::RecordingFolder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One exercise performed during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    /// Exercise name
    #[serde(default)]
    pub name: String,
    /// Target muscle group
    #[serde(default)]
    pub muscle_name: Option<String>,
    /// Recorded takes of this exercise
    #[serde(default)]
    pub gcs_folders: Vec<RecordingFolder>,
}

impl ExerciseEntry {
    /// Whether at least one recording exists
    pub fn has_motion(&self) -> bool {
        !self.gcs_folders.is_empty()
    }

    /// Number of recorded takes
    pub fn recording_count(&self) -> usize {
        self.gcs_folders.len()
    }

    /// Selector label
    pub fn label(&self) -> String {
        match &self.muscle_name {
            Some(muscle) => format!(
                "{} • {} • {} clips",
                self.name,
                muscle,
                self.recording_count()
            ),
            None => format!("{} • {} clips", self.name, self.recording_count()),
        }
    }
}

/// A training session with its exercises
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Session id
    #[serde(default)]
    pub id: Option<String>,
    /// Session date as stored (ISO 8601)
    #[serde(default)]
    pub date: Option<String>,
    /// Display name of the athlete
    #[serde(default, alias = "athleteName")]
    pub athlete_name: Option<String>,
    /// Exercises performed
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

impl Session {
    /// Load a session document from a JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let session = serde_json::from_str(&content)?;
        Ok(session)
    }

    /// Exercises that carry at least one recording, in session order
    pub fn exercises_with_motion(&self) -> Vec<ExerciseEntry> {
        self.exercises
            .iter()
            .filter(|e| e.has_motion())
            .cloned()
            .collect()
    }

    /// Header line: athlete, date and exercise count
    pub fn header(&self) -> String {
        format!(
            "{} | {} | {} exercises",
            self.athlete_name.as_deref().unwrap_or("Athlete"),
            self.date.as_deref().unwrap_or("Unknown Date"),
            self.exercises.len()
        )
    }
}
