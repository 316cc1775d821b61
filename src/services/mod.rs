pub mod chapter_classifier;
pub mod filter_engine;
pub mod list_store;
pub mod set_grouper;
pub mod set_groups;
pub mod tag_index;

pub use chapter_classifier::{ChapterClassifier, Classification, MatchRule, MoveOutcome};
pub use filter_engine::{CompiledFilter, FilterEngine};
pub use list_store::ListStore;
pub use set_grouper::{cluster, group_key};
pub use set_groups::{QuestionSetGroups, SetGroup};
pub use tag_index::TagIndex;
