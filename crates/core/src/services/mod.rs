//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod comment;
pub mod fanout;
pub mod notification;
pub mod push;
pub mod subject;
pub mod user;

pub use ballot::BallotService;
pub use comment::{CommentService, CreateCommentInput};
pub use fanout::FanoutService;
pub use notification::NotificationService;
pub use push::{ModeratorPush, NoOpPush, PushHandle};
pub use subject::{CreateSubjectInput, SubjectService};
pub use user::{CreateUserInput, UserService};
