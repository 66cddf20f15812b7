pub mod push_comment;

pub use push_comment::{PushCommentError, PushCommentUseCase};
