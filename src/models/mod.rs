pub mod chapter_grouping;
pub mod filter_state;
pub mod loaders;
pub mod question;
pub mod question_list;

pub use chapter_grouping::{ChapterGroupTable, ChapterGroupingFile, OTHERS_GROUP};
pub use filter_state::FilterState;
pub use question::Question;
pub use question_list::{ListMetadata, QuestionList};
