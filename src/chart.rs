//! Pie charts of a month's spending per category.
//!
//! [pie_chart] shapes the data into an ECharts configuration. A
//! [ChartRenderer] turns that configuration into something that can be sent
//! back to the user:
//! - `PngChartRenderer` (the default `png-charts` feature) renders a PNG image
//!   on the server, sent with a caption.
//! - [HtmlChartRenderer] builds a self-contained interactive HTML page, for
//!   builds without the server-side renderer.

use charming::{
    Chart, HtmlRenderer,
    component::{Legend, Title},
    element::{Color, Orient, Tooltip, Trigger},
    series::Pie,
};
use rust_decimal::prelude::ToPrimitive;

use crate::{Error, expense::Expense, report::summarize, transport::Reply};

/// The width of rendered charts in pixels.
pub const CHART_WIDTH: u32 = 800;
/// The height of rendered charts in pixels.
pub const CHART_HEIGHT: u32 = 600;

/// The caption sent along with a chart.
pub const CHART_CAPTION: &str = "📈 Gráfico de gastos por categoria";

const PALETTE: [&str; 6] = [
    "#ff6384", "#36a2eb", "#cc65fe", "#ffce56", "#4bc0c0", "#9966ff",
];

/// Build a pie chart of `expenses` grouped by category.
///
/// `month_name` is shown in the title, e.g. "Gastos por Categoria (outubro)".
pub fn pie_chart(expenses: &[Expense], month_name: &str) -> Chart {
    let data: Vec<(f64, &str)> = summarize(expenses)
        .by_category
        .into_iter()
        .map(|(category, total)| (total.to_f64().unwrap_or_default(), category.name()))
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text(format!("Gastos por Categoria ({month_name})"))
                .left("center"),
        )
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().orient(Orient::Vertical).right("5%").top("middle"))
        .color(PALETTE.into_iter().map(Color::from).collect())
        .series(Pie::new().name("Gastos por categoria").radius("60%").data(data))
}

/// Turns a chart into a reply the transport can send.
pub trait ChartRenderer: Send + Sync {
    /// Render `chart` into an attachment named after `file_stem`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::Render] if the chart could not be rendered.
    fn render(&self, chart: &Chart, file_stem: &str) -> Result<Reply, Error>;
}

/// Renders charts as an interactive HTML page sent as a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlChartRenderer;

impl ChartRenderer for HtmlChartRenderer {
    fn render(&self, chart: &Chart, file_stem: &str) -> Result<Reply, Error> {
        let html = HtmlRenderer::new(CHART_CAPTION, u64::from(CHART_WIDTH), u64::from(CHART_HEIGHT))
            .render(chart)
            .map_err(|error| Error::Render(format!("chart: {error:?}")))?;

        Ok(Reply::Document {
            bytes: html.into_bytes(),
            file_name: format!("{file_stem}.html"),
            mime_type: "text/html",
        })
    }
}

/// Renders charts as PNG images on the server.
#[cfg(feature = "png-charts")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PngChartRenderer;

#[cfg(feature = "png-charts")]
impl ChartRenderer for PngChartRenderer {
    fn render(&self, chart: &Chart, file_stem: &str) -> Result<Reply, Error> {
        use charming::{ImageFormat, ImageRenderer};

        let bytes = ImageRenderer::new(CHART_WIDTH, CHART_HEIGHT)
            .render_format(ImageFormat::Png, chart)
            .map_err(|error| Error::Render(format!("chart: {error:?}")))?;

        Ok(Reply::Image {
            bytes,
            file_name: format!("{file_stem}.png"),
            caption: CHART_CAPTION.to_owned(),
        })
    }
}

/// The PNG renderer, or the HTML renderer when built without `png-charts`.
pub fn default_renderer() -> Box<dyn ChartRenderer> {
    #[cfg(feature = "png-charts")]
    return Box::new(PngChartRenderer);

    #[cfg(not(feature = "png-charts"))]
    Box::new(HtmlChartRenderer)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{category::Category, ledger::test_utils::expense, transport::Reply};

    use super::{ChartRenderer, HtmlChartRenderer, default_renderer, pie_chart};

    #[test]
    fn pie_chart_has_one_slice_per_category() {
        let expenses = [
            expense("mercado", dec!(100), date!(2025 - 10 - 01), Category::Food),
            expense("uber", dec!(20), date!(2025 - 10 - 02), Category::Transport),
            expense("feira alimentação", dec!(50), date!(2025 - 10 - 03), Category::Food),
        ];

        let options = pie_chart(&expenses, "outubro").to_string();

        assert!(options.contains("Gastos por Categoria (outubro)"), "{options}");
        assert!(options.contains("alimentação"), "{options}");
        assert!(options.contains("transporte"), "{options}");
        assert!(options.contains("150"), "{options}");
        assert!(!options.contains("lazer"), "{options}");
    }

    #[test]
    fn html_renderer_produces_named_document() {
        let expenses = [expense("cinema", dec!(40), date!(2025 - 10 - 01), Category::Leisure)];
        let chart = pie_chart(&expenses, "outubro");

        let reply = HtmlChartRenderer.render(&chart, "grafico-5511-2025-10").unwrap();

        match reply {
            Reply::Document {
                bytes,
                file_name,
                mime_type,
            } => {
                assert_eq!(file_name, "grafico-5511-2025-10.html");
                assert_eq!(mime_type, "text/html");
                assert!(String::from_utf8(bytes).unwrap().contains("echarts"));
            }
            other => panic!("want a document, got {other:?}"),
        }
    }

    #[cfg(feature = "png-charts")]
    #[test]
    fn png_renderer_produces_image_with_caption() {
        use super::{CHART_CAPTION, PngChartRenderer};

        let expenses = [
            expense("mercado", dec!(150), date!(2025 - 10 - 01), Category::Food),
            expense("uber", dec!(23.9), date!(2025 - 10 - 02), Category::Transport),
        ];
        let chart = pie_chart(&expenses, "outubro");

        let reply = PngChartRenderer.render(&chart, "grafico-5511-2025-10").unwrap();

        match reply {
            Reply::Image {
                bytes,
                file_name,
                caption,
            } => {
                assert_eq!(file_name, "grafico-5511-2025-10.png");
                assert_eq!(caption, CHART_CAPTION);
                assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "{:?}", &bytes[..8]);
            }
            other => panic!("want an image, got {other:?}"),
        }
    }

    #[cfg(feature = "png-charts")]
    #[test]
    fn default_renderer_sends_an_image() {
        let expenses = [expense("cinema", dec!(40), date!(2025 - 10 - 01), Category::Leisure)];

        let reply = default_renderer()
            .render(&pie_chart(&expenses, "outubro"), "grafico")
            .unwrap();

        assert!(matches!(reply, Reply::Image { .. }), "{reply:?}");
    }

    #[cfg(not(feature = "png-charts"))]
    #[test]
    fn default_renderer_falls_back_to_html() {
        let expenses = [expense("cinema", dec!(40), date!(2025 - 10 - 01), Category::Leisure)];

        let reply = default_renderer()
            .render(&pie_chart(&expenses, "outubro"), "grafico")
            .unwrap();

        assert!(matches!(reply, Reply::Document { mime_type: "text/html", .. }), "{reply:?}");
    }
}
