use serde::Serialize;

use crate::model::{Direction, PriceBar};

const SUPPORT_LINE_COLOR: &str = "green";
const RESISTANCE_LINE_COLOR: &str = "red";
const SUPPORT_BAND_COLOR: &str = "rgba(0,255,0,0.2)";
const RESISTANCE_BAND_COLOR: &str = "rgba(255,0,0,0.2)";
const BAND_LINE_WIDTH: u32 = 2;

/// One candlestick data point, field names as the charting widget expects.
#[derive(Debug, Clone, Serialize)]
pub struct CandlePoint {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One line data point. A `None` value serializes as JSON `null`, which the
/// widget renders as a gap; the point is still emitted so every line series
/// stays index-aligned with the candle series.
#[derive(Debug, Clone, Serialize)]
pub struct LinePoint {
    pub time: String,
    pub value: Option<f64>,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerPosition {
    #[serde(rename = "belowBar")]
    BelowBar,
    #[serde(rename = "aboveBar")]
    AboveBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerShape {
    #[serde(rename = "arrowUp")]
    ArrowUp,
    #[serde(rename = "arrowDown")]
    ArrowDown,
    #[serde(rename = "circle")]
    Circle,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub time: String,
    pub position: MarkerPosition,
    pub color: &'static str,
    pub shape: MarkerShape,
    pub text: &'static str,
}

impl Marker {
    /// Marker style is a total function of the bar's direction.
    fn for_bar(bar: &PriceBar) -> Self {
        let (position, color, shape, text) = match bar.direction {
            Direction::Long => (MarkerPosition::BelowBar, "green", MarkerShape::ArrowUp, "LONG"),
            Direction::Short => (MarkerPosition::AboveBar, "red", MarkerShape::ArrowDown, "SHORT"),
            Direction::None => (MarkerPosition::AboveBar, "yellow", MarkerShape::Circle, "NONE"),
        };
        Self {
            time: bar.timestamp.clone(),
            position,
            color,
            shape,
            text,
        }
    }
}

/// A single chart series, tagged the way the widget's series list expects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SeriesSpec {
    Candlestick {
        data: Vec<CandlePoint>,
    },
    Line {
        data: Vec<LinePoint>,
        color: &'static str,
        #[serde(rename = "lineWidth")]
        line_width: u32,
        title: &'static str,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceScaleOptions {
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartOptions {
    pub height: u32,
    #[serde(rename = "rightPriceScale")]
    pub right_price_scale: PriceScaleOptions,
}

/// The complete payload for one chart panel: candles, band boundary
/// lines, direction markers, and display options.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub series: Vec<SeriesSpec>,
    pub markers: Vec<Marker>,
    pub options: ChartOptions,
}

/// Build the chart payload from parsed bars.
///
/// All output sequences share the input's length and per-index
/// timestamps; bars are never sorted, filtered, or deduplicated here.
pub fn build_chart(bars: &[PriceBar], height: u32) -> ChartSpec {
    ChartSpec {
        series: vec![
            SeriesSpec::Candlestick {
                data: candle_points(bars),
            },
            SeriesSpec::Line {
                data: band_points(bars, |bar| lower(&bar.support), SUPPORT_BAND_COLOR),
                color: SUPPORT_LINE_COLOR,
                line_width: BAND_LINE_WIDTH,
                title: "Support Lower",
            },
            SeriesSpec::Line {
                data: band_points(bars, |bar| upper(&bar.support), SUPPORT_BAND_COLOR),
                color: SUPPORT_LINE_COLOR,
                line_width: BAND_LINE_WIDTH,
                title: "Support Upper",
            },
            SeriesSpec::Line {
                data: band_points(bars, |bar| lower(&bar.resistance), RESISTANCE_BAND_COLOR),
                color: RESISTANCE_LINE_COLOR,
                line_width: BAND_LINE_WIDTH,
                title: "Resistance Lower",
            },
            SeriesSpec::Line {
                data: band_points(bars, |bar| upper(&bar.resistance), RESISTANCE_BAND_COLOR),
                color: RESISTANCE_LINE_COLOR,
                line_width: BAND_LINE_WIDTH,
                title: "Resistance Upper",
            },
        ],
        markers: markers(bars),
        options: ChartOptions {
            height,
            right_price_scale: PriceScaleOptions { visible: true },
        },
    }
}

fn candle_points(bars: &[PriceBar]) -> Vec<CandlePoint> {
    bars.iter()
        .map(|bar| CandlePoint {
            time: bar.timestamp.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        })
        .collect()
}

fn markers(bars: &[PriceBar]) -> Vec<Marker> {
    bars.iter().map(Marker::for_bar).collect()
}

fn band_points(
    bars: &[PriceBar],
    value_of: impl Fn(&PriceBar) -> Option<f64>,
    color: &'static str,
) -> Vec<LinePoint> {
    bars.iter()
        .map(|bar| LinePoint {
            time: bar.timestamp.clone(),
            value: value_of(bar),
            color,
        })
        .collect()
}

fn lower(levels: &[f64]) -> Option<f64> {
    levels.iter().copied().reduce(f64::min)
}

fn upper(levels: &[f64]) -> Option<f64> {
    levels.iter().copied().reduce(f64::max)
}
