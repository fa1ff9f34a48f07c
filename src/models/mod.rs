pub mod event;
pub mod notification;
pub mod participation;
pub mod user;

pub use event::Event;
pub use notification::Notification;
pub use participation::Participation;
pub use user::{User, UserProfile};
