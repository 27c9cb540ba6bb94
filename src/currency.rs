//! Brazilian real formatting for replies.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Format `amount` as Brazilian reais, e.g. `R$ 1.234,56`.
///
/// The symbol is followed by the no-break space the pt-BR locale uses. Amounts
/// are rounded to two decimal places (banker's rounding), grouped in thousands
/// with `.` and use `,` as the decimal separator.
pub fn format_currency(amount: Decimal) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| real_formatter("R$\u{a0}"));

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| real_formatter("-R$\u{a0}"));

    let number = amount.round_dp(2).to_f64().unwrap_or_default();

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "R$\u{a0}0,00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12,30" is rendered as "12,3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b',' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}

/// A formatter with a `.` thousands separator, which makes numfmt use `,` for
/// the decimal marker.
fn real_formatter(prefix: &str) -> Formatter {
    Formatter::currency(prefix)
        .and_then(|formatter| formatter.separator('.'))
        .expect("currency prefix and separator are valid")
        .precision(Precision::Decimals(2))
}
