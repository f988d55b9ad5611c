mod executor_reqwest;

pub use executor_reqwest::*;
