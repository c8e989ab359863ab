pub mod badge_service;
pub mod diagnostic_logger;
pub mod emote_service;
pub mod event_bridge;
pub mod message_store;
pub mod metadata_service;
pub mod nickname_service;
pub mod overlay_server;
pub mod overlay_service;
