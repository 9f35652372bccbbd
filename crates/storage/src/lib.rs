pub mod db;

pub use db::{
    category_usage, create_db, create_memory_db, get_categorized, get_uncategorized,
    list_accounts, top_transactions, update_category, upsert_transaction, DbPool, StorageError,
    UpsertOutcome,
};
