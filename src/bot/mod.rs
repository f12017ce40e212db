//! Conversation handling: message routing, greetings, activity dispatch.

pub mod activity;
pub mod greeter;
pub mod handler;
pub mod policy;
pub mod reply;
pub mod router;
pub mod traits;

pub use activity::{parse_activity, Activity, ActivityType, ChannelAccount, ConversationAccount};
pub use greeter::{WelcomeGreeter, WELCOME_TEXT};
pub use handler::DentaBot;
pub use policy::{Route, FALLBACK_TEXT};
pub use reply::CollectingSink;
pub use router::MessageRouter;
pub use traits::{IncomingMessage, OutgoingReply, ParticipantId, ReplySink};
