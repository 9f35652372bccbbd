pub mod catalog;
pub mod category;
pub mod chooser;
pub mod money;
pub mod period;
pub mod summary;
pub mod transaction;

pub use catalog::Catalog;
pub use category::{Category, CategoryEntry, CategoryError, CategoryId, Flatten};
pub use chooser::{CategoryChooser, ChooseError};
pub use money::{Money, MoneyError};
pub use period::{DateWindow, PeriodRates, Rate};
pub use summary::{render_overall, render_summary, summarize, CategorySummary};
pub use transaction::{NewTransaction, Transaction, TransactionId};
