mod category;
mod expense;
pub(crate) mod palette;

pub use category::Category;
pub use expense::{Expense, ExpenseUpdate};

#[cfg(test)]
mod tests;
