use serde::{Deserialize, Serialize};

pub mod movie;
pub mod title;

pub use movie::{MovieRecord, Rating};
pub use title::{ParsedTitle, UNKNOWN_YEAR};

/// A movie record as returned to the client, with the title already split
/// into display title and year
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieView {
    #[serde(flatten)]
    pub record: MovieRecord,
    pub display_title: String,
    pub year: String,
}

impl From<MovieRecord> for MovieView {
    fn from(record: MovieRecord) -> Self {
        let parsed = ParsedTitle::parse(&record.title);
        let year = parsed.year_or_unknown().to_string();

        Self {
            record,
            display_title: parsed.title,
            year,
        }
    }
}

// ============================================================================
// Recommendation Types
// ============================================================================

/// Why a recommendation list looks the way it does
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    /// Recommendations were computed (the list may still be empty)
    Ready,
    /// No rated favourites to derive recommendations from
    NoSignal,
    /// The catalog/model is not loaded
    Unavailable,
}

/// Result of a recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub status: RecommendationStatus,
    pub movies: Vec<MovieRecord>,
}

impl Recommendations {
    pub fn ready(movies: Vec<MovieRecord>) -> Self {
        Self {
            status: RecommendationStatus::Ready,
            movies,
        }
    }

    pub fn no_signal() -> Self {
        Self {
            status: RecommendationStatus::NoSignal,
            movies: Vec::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: RecommendationStatus::Unavailable,
            movies: Vec::new(),
        }
    }
}

/// A result tagged with the number of the request that produced it.
///
/// Sequence numbers increase with submission order, so a client that issued
/// several requests keeps only the result with the highest sequence it still
/// cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequenced<T> {
    pub sequence: u64,
    pub value: T,
}

// ============================================================================
// HTTP Payloads
// ============================================================================

/// Movie fields a client sends when rating a search result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePayload {
    pub movie_id: i64,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    pub title: String,
}

impl From<MoviePayload> for MovieRecord {
    fn from(payload: MoviePayload) -> Self {
        MovieRecord::new(payload.movie_id, payload.tmdb_id, payload.title)
    }
}

/// Request body for rating a movie into the favourites list
#[derive(Debug, Clone, Deserialize)]
pub struct RateRequest {
    pub movie: MoviePayload,
    pub rating: f32,
}

/// Response for a title search
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub sequence: u64,
    pub movies: Vec<MovieView>,
}

impl From<Sequenced<Vec<MovieRecord>>> for SearchResponse {
    fn from(result: Sequenced<Vec<MovieRecord>>) -> Self {
        Self {
            sequence: result.sequence,
            movies: result.value.into_iter().map(MovieView::from).collect(),
        }
    }
}

/// Response for a recommendation request
#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub sequence: u64,
    pub status: RecommendationStatus,
    pub movies: Vec<MovieView>,
}

impl From<Sequenced<Recommendations>> for RecommendationResponse {
    fn from(result: Sequenced<Recommendations>) -> Self {
        Self {
            sequence: result.sequence,
            status: result.value.status,
            movies: result.value.movies.into_iter().map(MovieView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_view_splits_title() {
        let view = MovieView::from(MovieRecord::new(1, Some(862), "Toy Story (1995)"));
        assert_eq!(view.display_title, "Toy Story");
        assert_eq!(view.year, "1995");
        assert_eq!(view.record.title, "Toy Story (1995)");
    }

    #[test]
    fn test_movie_view_serializes_flat() {
        let record = MovieRecord::new(2, None, "Jumanji").rated(Rating::new(3.5).unwrap());
        let json = serde_json::to_value(MovieView::from(record)).unwrap();
        assert_eq!(json["movieId"], 2);
        assert_eq!(json["tmdbId"], serde_json::Value::Null);
        assert_eq!(json["rating"], 3.5);
        assert_eq!(json["displayTitle"], "Jumanji");
        assert_eq!(json["year"], "N/A");
    }

    #[test]
    fn test_recommendation_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RecommendationStatus::NoSignal).unwrap(),
            "\"no_signal\""
        );
        assert_eq!(
            serde_json::to_string(&RecommendationStatus::Unavailable).unwrap(),
            "\"unavailable\""
        );
    }

    #[test]
    fn test_rate_request_deserialization() {
        let json = r#"{
            "movie": {"movieId": 79132, "tmdbId": 27205, "title": "Inception (2010)"},
            "rating": 4.5
        }"#;

        let request: RateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.rating, 4.5);

        let record: MovieRecord = request.movie.into();
        assert_eq!(record.movie_id, 79132);
        assert_eq!(record.tmdb_id, Some(27205));
        assert_eq!(record.rating, None);
    }

    #[test]
    fn test_recommendation_response_from_sequenced() {
        let response = RecommendationResponse::from(Sequenced {
            sequence: 7,
            value: Recommendations::unavailable(),
        });
        assert_eq!(response.sequence, 7);
        assert_eq!(response.status, RecommendationStatus::Unavailable);
        assert!(response.movies.is_empty());
    }
}
