pub mod db;
pub mod store;

pub use db::{
    create_db, get_entries, get_history_terms, get_subjects, insert_entry, insert_subject,
    seed_default_subjects, update_subject_synonyms, DbPool, EntryRecord,
};
pub use store::SqliteStore;
