pub mod activity;
pub mod photo;
pub mod review;
pub mod shop;
pub mod submission;
pub mod tag;

pub use activity::{ActivityEvent, CheckIn};
pub use photo::{MenuPhoto, ShopPhoto};
pub use review::ShopReview;
pub use shop::{Shop, ShopProcessingStatus};
pub use submission::{ShopSubmission, SubmissionStatus};
pub use tag::{ShopTag, TagDimension, TaxonomyTag};
