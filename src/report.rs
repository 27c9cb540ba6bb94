//! Turning a month of expenses into a summary or a spreadsheet.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::{Error, category::Category, expense::Expense};

/// The MIME type of the spreadsheets produced by [to_spreadsheet].
pub const SPREADSHEET_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// The name of the worksheet holding the expenses.
const SHEET_NAME: &str = "Gastos";

const HEADER: [&str; 4] = ["Descrição", "Valor", "Data", "Categoria"];

/// Spending per category and in total.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    /// The total for each category, in the order each category first appears.
    pub by_category: Vec<(Category, Decimal)>,
    /// The sum of every expense.
    pub grand_total: Decimal,
}

/// Sum `expenses` per category and overall.
pub fn summarize(expenses: &[Expense]) -> Summary {
    let mut summary = Summary::default();

    for expense in expenses {
        match summary
            .by_category
            .iter_mut()
            .find(|(category, _)| *category == expense.category)
        {
            Some((_, total)) => *total += expense.amount,
            None => summary.by_category.push((expense.category, expense.amount)),
        }

        summary.grand_total += expense.amount;
    }

    summary
}

/// Encode `expenses` as an Excel workbook with one row per expense on a
/// sheet named "Gastos".
///
/// # Errors
///
/// Returns an [Error::Render] if the workbook could not be written.
pub fn to_spreadsheet(expenses: &[Expense]) -> Result<Vec<u8>, Error> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(spreadsheet_error)?;

    for (col, title) in (0u16..).zip(HEADER) {
        worksheet
            .write_string(0, col, title)
            .map_err(spreadsheet_error)?;
    }

    for (row, expense) in (1u32..).zip(expenses) {
        worksheet
            .write_string(row, 0, expense.description.as_str())
            .and_then(|sheet| sheet.write_number(row, 1, expense.amount.to_f64().unwrap_or_default()))
            .and_then(|sheet| sheet.write_string(row, 2, expense.date.to_string()))
            .and_then(|sheet| sheet.write_string(row, 3, expense.category.name()))
            .map_err(spreadsheet_error)?;
    }

    workbook.save_to_buffer().map_err(spreadsheet_error)
}

fn spreadsheet_error(error: XlsxError) -> Error {
    Error::Render(format!("spreadsheet: {error}"))
}
