pub mod amount;
pub mod catalog;
pub mod entry;
pub mod matching;
pub mod parse;
pub mod payment;
pub mod policy;
pub mod subject;
pub mod time_slot;

pub use amount::Amount;
pub use catalog::{Bookkeeper, BookkeepingError, CatalogError, CatalogStore};
pub use entry::{EntryReceipt, LedgerError, UnvalidatedEntry, ValidatedEntry};
pub use matching::{MatchResult, MatchType};
pub use parse::{ParseError, ParseErrorKind, ParseResult, PartialData, UNKNOWN_SUBJECT};
pub use payment::{PaymentMethod, UNSPECIFIED_LABEL};
pub use policy::MatchPolicy;
pub use subject::{
    default_subjects, normalize_term, parse_synonym_list, Subject, SubjectKey, DEFAULT_SUBJECTS,
    LIST_SEPARATORS,
};
pub use time_slot::{default_time_slots, slot_for_hour, TimeSlot};
