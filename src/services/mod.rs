pub mod data_fetcher;
pub mod shaping;
pub mod static_teams;

pub use data_fetcher::*;
pub use shaping::*;
