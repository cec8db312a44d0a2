//! Concrete adapter implementations for ports, plus the terminal front end.

pub mod binance_adapter;
pub mod file_config_adapter;
pub mod file_store_adapter;
pub mod text_canvas;
pub mod tui;
