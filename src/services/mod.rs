pub mod catalog;
pub mod favourites;
pub mod recommendations;
pub mod title_search;

pub use catalog::Catalog;
pub use favourites::FavouritesService;
pub use recommendations::RecommendationEngine;
pub use title_search::SearchEngine;
