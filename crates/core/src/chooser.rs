use thiserror::Error;

use super::catalog::Catalog;
use super::category::CategoryEntry;
use super::transaction::Transaction;

#[derive(Debug, Error)]
pub enum ChooseError {
    #[error("Invalid category choice: {0}")]
    InvalidSelection(String),
    #[error("Input closed before a category was chosen")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asks a human to pick a category when matching could not decide.
///
/// `current` is the transaction's existing category, if it has one in the
/// catalog. Implementations validate the choice against `catalog` and must
/// not retry on bad input.
pub trait CategoryChooser {
    fn choose(
        &mut self,
        tx: &Transaction,
        current: Option<&CategoryEntry>,
        catalog: &Catalog,
    ) -> Result<CategoryEntry, ChooseError>;
}
