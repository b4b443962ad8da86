//! Database entities.

pub mod ballot;
pub mod comment;
pub mod notification;
pub mod subject;
pub mod user;

pub use ballot::Entity as Ballot;
pub use comment::Entity as Comment;
pub use notification::Entity as Notification;
pub use subject::Entity as Subject;
pub use user::Entity as User;
