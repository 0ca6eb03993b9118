pub mod commit;
pub mod config;
pub mod contract;
pub mod core_service;
pub mod index_store;
pub mod keymap;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod output;
pub mod overlay_state;
pub mod paging;
pub mod render;
pub mod runtime;
pub mod search;
pub mod session;
pub mod similarity;
pub mod transport;
