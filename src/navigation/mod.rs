pub mod enhancer;
pub mod history;
pub mod similarity;
