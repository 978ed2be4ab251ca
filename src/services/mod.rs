pub mod archive;
pub mod converter;
pub mod error;
pub mod lifecycle;
pub mod rasterizer;
pub mod reclaimer;
pub mod registry;
pub mod slide_deck;
pub mod storage;
