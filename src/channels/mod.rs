//! Chat surfaces the operator triages through.

pub mod surface;
pub mod telegram;

pub use surface::*;
pub use telegram::TelegramSurface;
