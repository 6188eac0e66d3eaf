mod message;
mod store;

pub use message::{Message, QuickReply, Reaction, ReactionKind, Sender, TimeOfDay};
pub use store::{Session, SessionStore, UserContext, UserInfo, UserInfoPatch};
