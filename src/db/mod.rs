pub mod favourites;
pub mod postgres;
pub mod redis;

pub use favourites::{FavouritesStore, InMemoryFavouritesStore, RedisFavouritesStore};
pub use postgres::{create_pool, load_catalog};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
