pub mod config;
pub mod export;
pub mod football_data;
pub mod http_cache;
pub mod http_client;
pub mod leagues;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod strength;
pub mod win_prob;
pub mod workbook;
