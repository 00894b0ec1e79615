pub mod bookmarks;
pub mod coordinates;
pub mod healing;
pub mod planner;
pub mod types;
