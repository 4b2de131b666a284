// Adapters layer: concrete implementations of the domain ports (cpal capture, Discord voice).

pub mod capture;
pub mod discord;
pub mod live_source;

pub use capture::CpalCapture;
pub use discord::DiscordVoice;
pub use live_source::LiveFrameSource;
