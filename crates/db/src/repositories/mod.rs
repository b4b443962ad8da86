//! Database repositories.

pub mod ballot;
pub mod comment;
pub mod notification;
pub mod subject;
pub mod user;

pub use ballot::{BallotRepository, CastBallot, CastOutcome};
pub use comment::CommentRepository;
pub use notification::NotificationRepository;
pub use subject::SubjectRepository;
pub use user::UserRepository;
