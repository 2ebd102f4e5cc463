use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::models::{MovieRecord, ParsedTitle};

/// A movie row as loaded from the catalog database
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CatalogMovie {
    pub movie_id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
}

impl CatalogMovie {
    pub fn new(movie_id: i64, tmdb_id: Option<i64>, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            tmdb_id,
            title: title.into(),
        }
    }
}

/// One community member's rating of a catalog movie
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct CommunityRating {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f32,
}

impl CommunityRating {
    pub fn new(user_id: i64, movie_id: i64, rating: f32) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
        }
    }
}

/// A catalog movie with its precomputed search key
#[derive(Debug, Clone)]
pub struct IndexedMovie {
    pub movie: CatalogMovie,
    /// Normalized title without the year suffix
    pub search_key: String,
    /// Number of community ratings, used as a popularity tie-breaker
    pub rating_count: usize,
}

impl IndexedMovie {
    pub fn to_record(&self) -> MovieRecord {
        MovieRecord::new(self.movie.movie_id, self.movie.tmdb_id, self.movie.title.clone())
    }
}

/// Lowercases and folds punctuation to single spaces
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Immutable snapshot of the movie universe plus an item-similarity model
/// built from community ratings.
///
/// Ratings are centered on each rater's mean so that generous and harsh
/// raters contribute comparable signal. Movies are addressed internally by
/// their position in the id-sorted movie list.
pub struct Catalog {
    movies: Vec<IndexedMovie>,
    positions: HashMap<i64, usize>,
    /// Per movie position: (user id, centered rating), sorted by user id
    item_ratings: Vec<Vec<(i64, f32)>>,
    /// Per user: (movie position, centered rating), sorted by position
    user_ratings: BTreeMap<i64, Vec<(usize, f32)>>,
    norms: Vec<f32>,
    fingerprint: u64,
}

impl Catalog {
    pub fn new(mut movies: Vec<CatalogMovie>, ratings: Vec<CommunityRating>) -> Self {
        movies.sort_by_key(|m| m.movie_id);
        movies.dedup_by_key(|m| m.movie_id);

        let positions: HashMap<i64, usize> = movies
            .iter()
            .enumerate()
            .map(|(pos, m)| (m.movie_id, pos))
            .collect();

        // Later duplicates of the same (user, movie) pair win
        let mut hasher = DefaultHasher::new();
        for movie in &movies {
            movie.movie_id.hash(&mut hasher);
            movie.tmdb_id.hash(&mut hasher);
            movie.title.hash(&mut hasher);
        }

        let mut by_user: BTreeMap<i64, BTreeMap<usize, f32>> = BTreeMap::new();
        let mut skipped = 0usize;
        for rating in ratings {
            match positions.get(&rating.movie_id) {
                Some(&pos) if rating.rating.is_finite() => {
                    by_user
                        .entry(rating.user_id)
                        .or_default()
                        .insert(pos, rating.rating);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Ignored ratings for unknown movies");
        }

        for (user_id, rated) in &by_user {
            user_id.hash(&mut hasher);
            for (pos, rating) in rated {
                pos.hash(&mut hasher);
                rating.to_bits().hash(&mut hasher);
            }
        }
        let fingerprint = hasher.finish();

        let mut item_ratings: Vec<Vec<(i64, f32)>> = vec![Vec::new(); movies.len()];
        let mut user_ratings: BTreeMap<i64, Vec<(usize, f32)>> = BTreeMap::new();

        for (user_id, rated) in by_user {
            let mean = rated.values().sum::<f32>() / rated.len() as f32;
            let centered: Vec<(usize, f32)> =
                rated.into_iter().map(|(pos, r)| (pos, r - mean)).collect();

            for &(pos, value) in &centered {
                item_ratings[pos].push((user_id, value));
            }
            user_ratings.insert(user_id, centered);
        }

        let norms = item_ratings
            .iter()
            .map(|ratings| ratings.iter().map(|(_, v)| v * v).sum::<f32>().sqrt())
            .collect();

        let movies = movies
            .into_iter()
            .zip(item_ratings.iter())
            .map(|(movie, ratings)| IndexedMovie {
                search_key: normalize(&ParsedTitle::parse(&movie.title).title),
                rating_count: ratings.len(),
                movie,
            })
            .collect();

        Self {
            movies,
            positions,
            item_ratings,
            user_ratings,
            norms,
            fingerprint,
        }
    }

    /// Identifies the snapshot contents; equal catalogs share a fingerprint
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Number of distinct community raters in the model
    pub fn rater_count(&self) -> usize {
        self.user_ratings.len()
    }

    pub fn movies(&self) -> &[IndexedMovie] {
        &self.movies
    }

    pub fn movie_at(&self, position: usize) -> Option<&IndexedMovie> {
        self.movies.get(position)
    }

    pub fn position_of(&self, movie_id: i64) -> Option<usize> {
        self.positions.get(&movie_id).copied()
    }

    /// Cosine similarity between `position` and every movie sharing at least
    /// `min_common_raters` raters with it, keeping positive similarities only.
    ///
    /// Vectors span all raters with a missing rating counted as zero, so the
    /// norms cover every rating of each movie, not only the shared ones.
    ///
    /// Results are ordered by position.
    pub fn similar_items(&self, position: usize, min_common_raters: usize) -> Vec<(usize, f32)> {
        let Some(ratings) = self.item_ratings.get(position) else {
            return Vec::new();
        };
        let norm = self.norms[position];
        if norm == 0.0 {
            return Vec::new();
        }

        // position -> (dot product, common raters)
        let mut overlap: BTreeMap<usize, (f32, usize)> = BTreeMap::new();
        for (user_id, value) in ratings {
            let Some(user_rated) = self.user_ratings.get(user_id) else {
                continue;
            };
            for &(other, other_value) in user_rated {
                if other == position {
                    continue;
                }
                let entry = overlap.entry(other).or_insert((0.0, 0));
                entry.0 += value * other_value;
                entry.1 += 1;
            }
        }

        overlap
            .into_iter()
            .filter(|(_, (_, common))| *common >= min_common_raters.max(1))
            .filter_map(|(other, (dot, _))| {
                let other_norm = self.norms[other];
                if other_norm == 0.0 {
                    return None;
                }
                let similarity = dot / (norm * other_norm);
                (similarity > 0.0).then_some((other, similarity))
            })
            .collect()
    }
}
