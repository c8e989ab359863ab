pub mod chat;
pub mod dom;
pub mod lenient;
pub mod settings;
pub mod widget;
