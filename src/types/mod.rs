pub mod digest;
pub mod feed;
pub mod news;

pub use digest::{Digest, DigestItem};
pub use feed::{FeedSource, MediaRef, RawEntry};
pub use news::NormalizedArticle;
