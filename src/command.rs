//! The chat command interpreter.
//!
//! Every message from an authorized user is read as a [Command] and run
//! against the ledger with [execute]. Keywords are matched before anything else,
//! so a message that is exactly a keyword (e.g. "menu") is never logged as an
//! expense, even if it could also be read as one.

use time::Date;

use crate::{
    Error,
    category::categorize,
    chart::{ChartRenderer, pie_chart},
    currency::format_currency,
    expense::{Expense, parse},
    ledger::Ledger,
    month::MonthKey,
    report::{SPREADSHEET_MIME_TYPE, summarize, to_spreadsheet},
    store::DocumentStore,
    transport::{MenuButton, Reply},
    user::UserId,
};

/// The buttons of the interactive menu.
pub const MENU_BUTTONS: [MenuButton; 4] = [
    MenuButton {
        id: "resumo",
        label: "📊 Resumo",
    },
    MenuButton {
        id: "exportar",
        label: "📁 Exportar Excel",
    },
    MenuButton {
        id: "grafico",
        label: "📈 Gráfico",
    },
    MenuButton {
        id: "ajuda",
        label: "❓ Ajuda",
    },
];

const HELP_TEXT: &str = "\
📌 *Comandos disponíveis no Domus:*

1️⃣ *Registrar gasto:* envie a descrição, o valor e, se quiser, a data.
Exemplos:
- \"cafezinho 7,50\"
- \"mercado alimentação 150,00\"
- \"cinema lazer 50 reais 2025-05-20\"

*Dica:* para categorizar, inclua a categoria na descrição.
Categorias: alimentação, transporte, saúde, lazer, moradia, outros.

2️⃣ *Resumo:* envie \"resumo\" para ver quanto gastou por categoria e o total do mês.
3️⃣ *Exportar:* envie \"exportar\" para receber uma planilha Excel com os gastos do mês.
4️⃣ *Gráfico:* envie \"gráfico\" ou \"grafico\" para receber um gráfico em pizza dos gastos.
5️⃣ *Apagar:* \"apagar 2\" apaga um gasto específico; \"apagar tudo\" apaga todos os gastos do mês.
6️⃣ *Menu:* envie \"menu\" para acessar os botões interativos.";

const MENU_TEXT: &str = "📋 Menu de Comandos Domus\n\nEscolha uma opção abaixo:";
const NO_EXPENSES_THIS_MONTH: &str = "Você não possui gastos registrados neste mês.";
const NOTHING_TO_ERASE: &str = "Você não tem gastos registrados neste mês.";
const MONTH_ERASED: &str = "Todos os seus gastos deste mês foram apagados.";
const DELETE_USAGE: &str = "Por favor, informe o número do gasto. Ex: apagar 2";
const INVALID_NUMBER: &str = "Número inválido.";
const EXPENSE_DELETED: &str = "Gasto apagado com sucesso.";
const NO_SUMMARY_YET: &str = "Você ainda não registrou gastos este mês.";
const INVALID_FORMAT: &str =
    "Formato inválido. Ex: \"cafezinho 7,50\" ou \"mercado 100 reais 2025-05-15\"";

/// What a message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the available commands.
    Help,
    /// Show the interactive menu.
    Menu,
    /// Send a pie chart of this month's spending.
    Chart,
    /// Send this month's expenses as a spreadsheet.
    Export,
    /// Erase every expense of this month.
    ClearMonth,
    /// Erase one expense, by its 1-based position in this month's list.
    ///
    /// `None` if the message did not include a number.
    Delete(Option<i64>),
    /// Show this month's spending per category.
    Summary,
    /// Log the message as an expense.
    Record(String),
}

impl Command {
    /// Read `text` as a command.
    ///
    /// Keywords are matched against the trimmed, lower-cased text, in priority
    /// order. Anything that is not a keyword is an expense to record.
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();

        match normalized.as_str() {
            "ajuda" | "help" => Command::Help,
            "menu" => Command::Menu,
            "grafico" | "gráfico" => Command::Chart,
            "exportar" => Command::Export,
            command if command.starts_with("apagar tudo") => Command::ClearMonth,
            command if command.starts_with("apagar") || command.starts_with("remover") => {
                let position = command.split_whitespace().nth(1).and_then(parse_position);

                Command::Delete(position)
            }
            "resumo" => Command::Summary,
            _ => Command::Record(text.to_owned()),
        }
    }
}

/// Read the leading integer of `token`, e.g. 2 from "2x".
///
/// Returns `None` if the token does not start with a number. Numbers too large
/// for an `i64` saturate, so they are out of range rather than missing.
fn parse_position(token: &str) -> Option<i64> {
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };

    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];

    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);

    Some(if negative { -magnitude } else { magnitude })
}

/// Everything a command needs to run for one message.
pub struct CommandContext<'a> {
    /// The normalized identifier of the user who sent the message.
    pub user: &'a UserId,
    /// The day the message arrived, in the bot's timezone. Its month is the
    /// month commands operate on.
    pub today: Date,
    /// The ledger store. Callers sharing the store must hold its lock for the
    /// whole call.
    pub ledger: &'a dyn DocumentStore<Ledger>,
    /// Renders charts for [Command::Chart].
    pub charts: &'a dyn ChartRenderer,
}

impl CommandContext<'_> {
    fn month(&self) -> MonthKey {
        MonthKey::from_date(self.today)
    }
}

/// Run `command` for the user in `context` and return the reply to send.
///
/// Mistakes in the user's message (bad format, bad number) are answered with a
/// reply, not an error.
///
/// # Errors
///
/// Returns an error if the ledger could not be loaded or saved, or if a chart
/// or spreadsheet could not be rendered.
pub fn execute(command: &Command, context: &CommandContext) -> Result<Reply, Error> {
    match command {
        Command::Help => Ok(Reply::Text(HELP_TEXT.to_owned())),
        Command::Menu => Ok(Reply::Menu {
            text: MENU_TEXT.to_owned(),
            buttons: MENU_BUTTONS.to_vec(),
        }),
        Command::Chart => send_chart(context),
        Command::Export => export(context),
        Command::ClearMonth => clear_month(context),
        Command::Delete(position) => delete(*position, context),
        Command::Summary => summary(context),
        Command::Record(text) => record(text, context),
    }
}

fn send_chart(context: &CommandContext) -> Result<Reply, Error> {
    let ledger = context.ledger.load()?;
    let month = context.month();
    let expenses = ledger.get_month(context.user, month);

    if expenses.is_empty() {
        return Ok(text(NO_EXPENSES_THIS_MONTH));
    }

    let chart = pie_chart(expenses, month.month_name());
    let file_stem = format!("grafico-{}-{month}", context.user.local_part());

    context.charts.render(&chart, &file_stem)
}

fn export(context: &CommandContext) -> Result<Reply, Error> {
    let ledger = context.ledger.load()?;
    let month = context.month();
    let expenses = ledger.get_month(context.user, month);

    if expenses.is_empty() {
        return Ok(text(NO_EXPENSES_THIS_MONTH));
    }

    Ok(Reply::Document {
        bytes: to_spreadsheet(expenses)?,
        file_name: format!("{}-{month}.xlsx", context.user.local_part()),
        mime_type: SPREADSHEET_MIME_TYPE,
    })
}

fn clear_month(context: &CommandContext) -> Result<Reply, Error> {
    let mut ledger = context.ledger.load()?;

    if !ledger.clear_month(context.user, context.month()) {
        return Ok(text(NOTHING_TO_ERASE));
    }

    context.ledger.save(&ledger)?;
    tracing::info!("erased {} for {}", context.month(), context.user);

    Ok(text(MONTH_ERASED))
}

fn delete(position: Option<i64>, context: &CommandContext) -> Result<Reply, Error> {
    let Some(position) = position else {
        return Ok(text(DELETE_USAGE));
    };

    let index = match usize::try_from(position) {
        Ok(position) if position >= 1 => position - 1,
        _ => return Ok(text(INVALID_NUMBER)),
    };

    let mut ledger = context.ledger.load()?;

    if !ledger.delete_at(context.user, context.month(), index) {
        return Ok(text(INVALID_NUMBER));
    }

    context.ledger.save(&ledger)?;

    Ok(text(EXPENSE_DELETED))
}

fn summary(context: &CommandContext) -> Result<Reply, Error> {
    let ledger = context.ledger.load()?;
    let month = context.month();
    let expenses = ledger.get_month(context.user, month);

    if expenses.is_empty() {
        return Ok(text(NO_SUMMARY_YET));
    }

    let summary = summarize(expenses);
    let mut message = format!("📊 Resumo de {}\n\n", month.month_name());

    for (category, total) in &summary.by_category {
        message.push_str(&format!("📂 {category}: {}\n", format_currency(*total)));
    }

    message.push_str(&format!(
        "\n💰 Total geral: {}",
        format_currency(summary.grand_total)
    ));

    Ok(Reply::Text(message))
}

fn record(message: &str, context: &CommandContext) -> Result<Reply, Error> {
    let Some(candidate) = parse(message, context.today) else {
        return Ok(text(INVALID_FORMAT));
    };

    let expense = candidate.into_expense(categorize(message));
    let month = context.month();

    let mut ledger = context.ledger.load()?;
    ledger.append(context.user, month, expense);
    context.ledger.save(&ledger)?;

    Ok(Reply::Text(month_listing(
        ledger.get_month(context.user, month),
        month,
    )))
}

/// The numbered list of a month's expenses followed by the month's total.
fn month_listing(expenses: &[Expense], month: MonthKey) -> String {
    let lines: Vec<String> = expenses
        .iter()
        .enumerate()
        .map(|(i, expense)| {
            format!(
                "{}. {} - {} - {}",
                i + 1,
                expense.description,
                format_currency(expense.amount),
                expense.date.day_label()
            )
        })
        .collect();

    let total = summarize(expenses).grand_total;

    format!(
        "📅 *Gastos de {}*\n\n{}\n\n💰 *Total:* {}",
        month.month_name(),
        lines.join("\n"),
        format_currency(total)
    )
}

fn text(message: &str) -> Reply {
    Reply::Text(message.to_owned())
}


#[cfg(test)]
mod execute_tests {
    use charming::Chart;
    use rust_decimal_macros::dec;
    use time::{Date, macros::date};

    use crate::{
        Error,
        category::Category,
        chart::ChartRenderer,
        expense::ExpenseDate,
        ledger::{Ledger, test_utils::expense},
        month::MonthKey,
        store::{DocumentStore, MemoryStore},
        transport::Reply,
        user::UserId,
    };

    use super::{Command, CommandContext, MENU_BUTTONS, SPREADSHEET_MIME_TYPE, execute};

    const TODAY: Date = date!(2025 - 10 - 19);

    /// Returns the chart options as the image bytes so tests can inspect them.
    struct FakeChartRenderer;

    impl ChartRenderer for FakeChartRenderer {
        fn render(&self, chart: &Chart, file_stem: &str) -> Result<Reply, Error> {
            Ok(Reply::Image {
                bytes: chart.to_string().into_bytes(),
                file_name: format!("{file_stem}.png"),
                caption: "chart".to_owned(),
            })
        }
    }

    fn user() -> UserId {
        UserId::new("5511912345678@s.whatsapp.net")
    }

    fn october() -> MonthKey {
        MonthKey::from_date(TODAY)
    }

    fn run(text: &str, store: &MemoryStore<Ledger>) -> Reply {
        let user = user();
        let context = CommandContext {
            user: &user,
            today: TODAY,
            ledger: store,
            charts: &FakeChartRenderer,
        };

        execute(&Command::parse(text), &context).expect("command should succeed")
    }

    fn reply_text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            other => panic!("want a text reply, got {other:?}"),
        }
    }

    fn store_with(expenses: &[(&str, rust_decimal::Decimal, Category)]) -> MemoryStore<Ledger> {
        let mut ledger = Ledger::new();
        for (description, amount, category) in expenses {
            ledger.append(
                &user(),
                october(),
                expense(description, *amount, TODAY, *category),
            );
        }
        MemoryStore::new(ledger)
    }

    #[test]
    fn records_expense_and_lists_month() {
        let store = store_with(&[("pão", dec!(5), Category::Food)]);

        let got = reply_text(run("cafezinho 7,50", &store));

        assert_eq!(
            got,
            "📅 *Gastos de outubro*\n\n\
             1. pão - R$\u{a0}5,00 - 19\n\
             2. cafezinho - R$\u{a0}7,50 - 19\n\n\
             💰 *Total:* R$\u{a0}12,50"
        );

        let ledger = store.load().unwrap();
        let saved = ledger.get_month(&user(), october());
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].description, "cafezinho");
        assert_eq!(saved[1].category, Category::Other);
    }

    #[test]
    fn records_category_from_whole_message() {
        let store = store_with(&[]);

        run("cinema lazer 50 reais 2025-05-20", &store);

        let ledger = store.load().unwrap();
        let saved = &ledger.get_month(&user(), october())[0];
        assert_eq!(saved.category, Category::Leisure);
        assert_eq!(saved.date, ExpenseDate::Day(date!(2025 - 05 - 20)));
    }

    #[test]
    fn unparseable_expense_gets_format_hint_and_saves_nothing() {
        let store = store_with(&[]);

        let got = reply_text(run("no amount here", &store));

        assert!(got.starts_with("Formato inválido"), "{got}");
        assert_eq!(store.load().unwrap(), Ledger::new());
    }

    #[test]
    fn help_lists_every_command() {
        let got = reply_text(run("ajuda", &store_with(&[])));

        for command in ["resumo", "exportar", "gráfico", "apagar 2", "apagar tudo", "menu"] {
            assert!(got.contains(command), "help does not mention {command}");
        }
    }

    #[test]
    fn menu_offers_buttons() {
        let got = run("menu", &store_with(&[]));

        match got {
            Reply::Menu { buttons, .. } => {
                assert_eq!(buttons, MENU_BUTTONS.to_vec());
                assert_eq!(buttons[1].id, "exportar");
                assert_eq!(buttons[1].label, "📁 Exportar Excel");
            }
            other => panic!("want a menu, got {other:?}"),
        }
    }

    #[test]
    fn summary_groups_by_category_with_total() {
        let store = store_with(&[
            ("mercado", dec!(150), Category::Food),
            ("uber", dec!(23.9), Category::Transport),
            ("feira", dec!(1000.1), Category::Food),
        ]);

        let got = reply_text(run("resumo", &store));

        assert_eq!(
            got,
            "📊 Resumo de outubro\n\n\
             📂 alimentação: R$\u{a0}1.150,10\n\
             📂 transporte: R$\u{a0}23,90\n\
             \n💰 Total geral: R$\u{a0}1.174,00"
        );
    }

    #[test]
    fn summary_of_empty_month() {
        let got = reply_text(run("resumo", &store_with(&[])));

        assert_eq!(got, "Você ainda não registrou gastos este mês.");
    }

    #[test]
    fn delete_removes_expense_by_position() {
        let store = store_with(&[
            ("pão", dec!(5), Category::Food),
            ("uber", dec!(20), Category::Transport),
            ("cinema", dec!(40), Category::Leisure),
        ]);

        let got = reply_text(run("apagar 2", &store));

        assert_eq!(got, "Gasto apagado com sucesso.");
        let ledger = store.load().unwrap();
        let descriptions: Vec<_> = ledger
            .get_month(&user(), october())
            .iter()
            .map(|expense| expense.description.as_str())
            .collect();
        assert_eq!(descriptions, ["pão", "cinema"]);
    }

    #[test]
    fn delete_rejects_bad_positions() {
        let store = store_with(&[("pão", dec!(5), Category::Food)]);
        let before = store.load().unwrap();

        assert_eq!(reply_text(run("apagar 0", &store)), "Número inválido.");
        assert_eq!(reply_text(run("apagar 2", &store)), "Número inválido.");
        assert_eq!(reply_text(run("remover -3", &store)), "Número inválido.");
        assert_eq!(
            reply_text(run("apagar 99999999999999999999", &store)),
            "Número inválido."
        );
        assert_eq!(
            reply_text(run("apagar", &store)),
            "Por favor, informe o número do gasto. Ex: apagar 2"
        );
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn clear_month_erases_then_reports_nothing_left() {
        let store = store_with(&[("pão", dec!(5), Category::Food)]);

        assert_eq!(
            reply_text(run("apagar tudo", &store)),
            "Todos os seus gastos deste mês foram apagados."
        );
        assert_eq!(store.load().unwrap(), Ledger::new());
        assert_eq!(
            reply_text(run("apagar tudo", &store)),
            "Você não tem gastos registrados neste mês."
        );
    }

    #[test]
    fn chart_and_export_need_expenses() {
        let store = store_with(&[]);

        for command in ["grafico", "gráfico", "exportar"] {
            assert_eq!(
                reply_text(run(command, &store)),
                "Você não possui gastos registrados neste mês."
            );
        }
    }

    #[test]
    fn chart_is_rendered_for_current_month() {
        let store = store_with(&[("mercado", dec!(150), Category::Food)]);

        match run("gráfico", &store) {
            Reply::Image {
                bytes, file_name, ..
            } => {
                assert_eq!(file_name, "grafico-5511912345678-2025-10.png");
                let options = String::from_utf8(bytes).unwrap();
                assert!(options.contains("Gastos por Categoria (outubro)"), "{options}");
            }
            other => panic!("want an image, got {other:?}"),
        }
    }

    #[test]
    fn export_sends_spreadsheet_document() {
        let store = store_with(&[("mercado", dec!(150), Category::Food)]);

        match run("exportar", &store) {
            Reply::Document {
                bytes,
                file_name,
                mime_type,
            } => {
                assert_eq!(file_name, "5511912345678-2025-10.xlsx");
                assert_eq!(mime_type, SPREADSHEET_MIME_TYPE);
                assert!(bytes.starts_with(b"PK"));
            }
            other => panic!("want a document, got {other:?}"),
        }
    }

    #[test]
    fn other_users_expenses_are_not_visible() {
        let store = store_with(&[("mercado", dec!(150), Category::Food)]);
        let stranger = UserId::new("5521999999999@s.whatsapp.net");
        let context = CommandContext {
            user: &stranger,
            today: TODAY,
            ledger: &store,
            charts: &FakeChartRenderer,
        };

        let got = execute(&Command::Summary, &context).unwrap();

        assert_eq!(
            got,
            Reply::Text("Você ainda não registrou gastos este mês.".to_owned())
        );
    }

    #[test]
    fn corrupt_ledger_is_an_error() {
        struct CorruptStore;

        impl DocumentStore<Ledger> for CorruptStore {
            fn load(&self) -> Result<Ledger, Error> {
                Err(Error::StorageCorrupt {
                    path: "gastos.json".to_owned(),
                    reason: "expected value".to_owned(),
                })
            }

            fn save(&self, _: &Ledger) -> Result<(), Error> {
                panic!("a corrupt ledger must not be overwritten");
            }
        }

        let user = user();
        let context = CommandContext {
            user: &user,
            today: TODAY,
            ledger: &CorruptStore,
            charts: &FakeChartRenderer,
        };

        let got = execute(&Command::parse("cafezinho 7,50"), &context);

        assert!(matches!(got, Err(Error::StorageCorrupt { .. })), "{got:?}");
    }
}
