//! Services layer - Business logic
//!
//! Services implement the rules of the portal on top of the repositories:
//! publishing quota, permissions, rating arithmetic, the censor filter and
//! email notifications.

pub mod category;
pub mod censor;
pub mod comment;
pub mod email;
pub mod notification;
pub mod pagination;
pub mod password;
pub mod post;
pub mod rating;
pub mod templates;
pub mod user;

pub use category::{CategoryService, CategoryServiceError, SubscriptionStatus};
pub use censor::{Censor, CensorError};
pub use comment::{CommentService, CommentServiceError};
pub use email::{create_mailer, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use notification::{
    DigestOutcome, DigestSummary, NotificationDispatcher, NotificationError, NotificationOutcome, SiteLinks,
};
pub use pagination::{page_window, PageWindow};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use rating::{author_rating, RatingDelta, RatingEngine, RatingError, RatingTarget};
pub use templates::EmailTemplates;
pub use user::{LoginInput, UserService, UserServiceError};
