pub mod announcements;
pub mod audio;
pub mod config;
pub mod playback;
pub mod spotify;

pub use announcements::*;
pub use audio::*;
pub use config::*;
pub use playback::*;
pub use spotify::*;
