use std::io::{BufRead, Write};

use tally_core::{Catalog, CategoryChooser, CategoryEntry, CategoryId, ChooseError, Transaction};

/// Line-oriented prompts over any reader/writer pair (stdin/stdout in the binary).
pub struct TerminalChooser<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, ChooseError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ChooseError::Closed);
        }
        Ok(line.trim().to_string())
    }

    /// Offers the known accounts by number, or takes a new name.
    pub fn choose_account(&mut self, file_name: &str, existing: &[String]) -> Result<String, ChooseError> {
        writeln!(self.output, "\nProcessing file: {file_name}")?;
        if existing.is_empty() {
            return self.require_name(&format!("Enter the account name for '{file_name}': "));
        }

        writeln!(self.output, "Existing accounts:")?;
        for (i, account) in existing.iter().enumerate() {
            writeln!(self.output, "  {}. {account}", i + 1)?;
        }
        let new_option = existing.len() + 1;
        writeln!(self.output, "  {new_option}. Enter a new account name")?;

        let choice = self.read_line("Select an account by number or enter a new name: ")?;
        match choice.parse::<usize>() {
            Ok(n) if (1..=existing.len()).contains(&n) => Ok(existing[n - 1].clone()),
            Ok(n) if n == new_option => self.require_name("Enter new account name: "),
            _ if choice.is_empty() => self.require_name("Enter account name: "),
            _ => Ok(choice),
        }
    }

    fn require_name(&mut self, prompt: &str) -> Result<String, ChooseError> {
        let name = self.read_line(prompt)?;
        if name.is_empty() {
            return Err(ChooseError::InvalidSelection("empty account name".to_string()));
        }
        Ok(name)
    }
}

impl<R: BufRead, W: Write> CategoryChooser for TerminalChooser<R, W> {
    fn choose(
        &mut self,
        tx: &Transaction,
        current: Option<&CategoryEntry>,
        catalog: &Catalog,
    ) -> Result<CategoryEntry, ChooseError> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        writeln!(
            self.output,
            "\n{} {} {} {}",
            tx.description,
            opt(&tx.particulars),
            opt(&tx.code),
            opt(&tx.reference)
        )?;
        writeln!(
            self.output,
            "Amount: {} Date: {} Account: {} ID: {}",
            tx.amount,
            tx.date.format("%A %d %B %Y"),
            tx.account,
            tx.id
        )?;
        writeln!(
            self.output,
            "Category: {}\n",
            current.map_or("None", |c| c.description.as_str())
        )?;

        writeln!(self.output, "Please choose a category:")?;
        for (i, entry) in catalog.entries().iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, entry.description)?;
        }

        let choice = self.read_line("Category number or id: ")?;
        let chosen = match choice.parse::<usize>() {
            Ok(n) => catalog.select(n).ok(),
            Err(_) => catalog.get(&CategoryId::new(choice.as_str())),
        };
        chosen
            .cloned()
            .ok_or(ChooseError::InvalidSelection(choice))
    }
}
