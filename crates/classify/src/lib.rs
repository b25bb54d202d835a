pub mod catalog;
pub mod classifier;
pub mod disambiguate;
pub mod learner;
pub mod match_engine;
pub mod multi_mapping;
pub mod parser;
pub mod remark;
pub mod response;
pub(crate) mod util;

pub use catalog::{CachedCatalog, MemoryCatalog};
pub use classifier::{Classification, Classifier};
pub use disambiguate::{Resolution, TimeDisambiguator};
pub use learner::{LearnAction, LearnError, LearnOutcome, SkipReason, SynonymLearner};
pub use match_engine::MatchEngine;
pub use multi_mapping::find_ambiguous;
pub use parser::InputParser;
pub use remark::{format_remark, RemarkFormatter};
pub use response::{
    parse_labeled_lines, Failure, MessageData, Outcome, RenderOptions, RenderedMessage,
    ResponseFormatter, DEFAULT_REMARK,
};
