use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// A movie as seen by clients: search and recommendation results are unrated,
/// favourites carry a rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    /// Internal catalog identifier
    pub movie_id: i64,
    /// TMDb identifier, only used for cover art
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    /// Raw title, usually with a "(Year)" suffix
    pub title: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl MovieRecord {
    /// Creates an unrated record
    pub fn new(movie_id: i64, tmdb_id: Option<i64>, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            tmdb_id,
            title: title.into(),
            rating: None,
        }
    }

    /// Returns a copy of this record carrying the given rating
    pub fn rated(mut self, rating: Rating) -> Self {
        self.rating = Some(rating.value());
        self
    }

    pub fn is_favourite(&self) -> bool {
        self.rating.is_some()
    }
}

/// A validated user rating: 0.5 to 5.0 in half-star steps
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rating(f32);

impl Rating {
    pub const MIN: f32 = 0.5;
    pub const MAX: f32 = 5.0;

    pub fn new(value: f32) -> AppResult<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(AppError::InvalidInput(format!(
                "Rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }

        if (value * 2.0).fract() != 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Rating must be a multiple of 0.5, got {}",
                value
            )));
        }

        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Rating {
    type Error = AppError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}
