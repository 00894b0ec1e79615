pub mod bookmarks;
pub mod doctor;
pub mod export;
pub mod maintenance;
pub mod route;
pub mod stats;
