pub mod channel_id;
pub mod dom;
pub mod extractor;
pub mod like_count;


pub use channel_id::extract_account_id;
pub use dom::{is_comment_element, MutationBatch, PageDocument, COMMENT_CONTAINER_SELECTORS};
pub use ego_tree::NodeId;
pub use extractor::{extract_comment, extract_like_count, EMPHASIS_FONT_WEIGHT, MIN_TEXT_CHARS};
pub use like_count::parse_like_count;
