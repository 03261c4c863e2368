use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::chart::{self, ChartSpec};
use crate::chat::{ChatTurn, SessionStore};
use crate::config::AppConfig;
use crate::dataset;

const ASSISTANT_UNAVAILABLE: &str =
    "The assistant is unavailable right now. Please try again later.";

pub struct AppState {
    dataset_path: PathBuf,
    symbol: String,
    chart_height: u32,
    assistant: Arc<dyn Assistant>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(config: &AppConfig, assistant: Arc<dyn Assistant>) -> Self {
        Self {
            dataset_path: PathBuf::from(&config.dataset.path),
            symbol: config.dataset.symbol.clone(),
            chart_height: config.server.chart_height,
            assistant,
            sessions: SessionStore::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/chart", get(chart_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/history", get(history_handler))
        .route("/api/chat/session", delete(end_session_handler))
        .with_state(state)
}

/// Build the chart payload from a fresh read of the backing table.
///
/// Every request re-derives the series, so edits to the CSV show up on
/// the next page refresh without a restart.
async fn chart_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChartSpec>>, StatusCode> {
    let bars = dataset::load(&state.dataset_path).map_err(|report| {
        warn!(error = ?report, "dataset load failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let spec = chart::build_chart(&bars, state.chart_height);
    Ok(Json(vec![spec]))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<Uuid>,
    question: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: Uuid,
    answer: String,
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let question = request.question.trim().to_owned();
    if question.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let session_id = request
        .session_id
        .unwrap_or_else(|| state.sessions.create());

    // The sample row gives the model the column shape; a broken dataset
    // degrades to a prompt without it rather than failing the chat.
    let sample = match dataset::load(&state.dataset_path) {
        Ok(bars) => bars.into_iter().next(),
        Err(report) => {
            warn!(error = ?report, "dataset load failed, chatting without sample row");
            None
        }
    };

    let answer = match state.assistant.answer(&question, sample.as_ref()).await {
        Ok(answer) => answer,
        Err(report) => {
            warn!(error = ?report, "assistant call failed");
            ASSISTANT_UNAVAILABLE.to_owned()
        }
    };

    state
        .sessions
        .append(session_id, question, answer.clone());

    Ok(Json(ChatResponse { session_id, answer }))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Uuid,
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<ChatTurn>>, StatusCode> {
    match state.sessions.history(query.session_id) {
        Some(turns) => Ok(Json(turns)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> StatusCode {
    if state.sessions.end(query.session_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Main dashboard page: chart tab plus chat tab. Rendering is done by the
/// Lightweight Charts standalone script in the browser against the
/// `/api/chart` payload.
async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let symbol = &state.symbol;
    let html = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{symbol} Dashboard</title>
    <script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #131722;
            color: #d1d4dc;
            min-height: 100vh;
        }}
        .header {{
            padding: 12px 24px;
            background: #1e222d;
            border-bottom: 1px solid #2a2e39;
            display: flex;
            align-items: center;
            gap: 16px;
        }}
        .header h1 {{
            font-size: 18px;
            color: #00c853;
            font-weight: 600;
        }}
        .tabs {{
            display: flex;
            gap: 8px;
        }}
        .tabs button {{
            background: #2a2e39;
            border: 1px solid #363c4e;
            color: #d1d4dc;
            padding: 8px 16px;
            border-radius: 4px;
            font-size: 14px;
            cursor: pointer;
        }}
        .tabs button.active {{
            background: #00c853;
            color: #131722;
            font-weight: 600;
        }}
        .panel {{ display: none; padding: 16px 24px; }}
        .panel.active {{ display: block; }}
        #chart-container {{ width: 100%; }}
        .status {{ color: #787b86; font-size: 13px; margin: 8px 0; }}
        .chat-log {{
            max-height: 50vh;
            overflow-y: auto;
            margin-bottom: 12px;
        }}
        .chat-turn {{ margin: 12px 0; }}
        .chat-turn .you {{ color: #00c853; font-weight: 600; }}
        .chat-turn .bot {{ color: #2196f3; font-weight: 600; }}
        .chat-input {{ display: flex; gap: 8px; }}
        .chat-input input {{
            flex: 1;
            background: #2a2e39;
            border: 1px solid #363c4e;
            color: #d1d4dc;
            padding: 10px 12px;
            border-radius: 4px;
            font-size: 14px;
        }}
        .chat-input button {{
            background: #00c853;
            border: none;
            color: #131722;
            padding: 10px 20px;
            border-radius: 4px;
            font-weight: 600;
            cursor: pointer;
        }}
        .hint {{ color: #787b86; font-size: 12px; margin-top: 12px; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>{symbol} Candlestick Dashboard</h1>
        <div class="tabs">
            <button id="tab-chart" class="active" onclick="showTab('chart')">Chart</button>
            <button id="tab-chat" onclick="showTab('chat')">Assistant</button>
        </div>
    </div>

    <div id="panel-chart" class="panel active">
        <div class="status" id="chart-status">Loading chart...</div>
        <div id="chart-container"></div>
    </div>

    <div id="panel-chat" class="panel">
        <div class="chat-log" id="chat-log"></div>
        <div class="chat-input">
            <input id="chat-question" type="text"
                   placeholder="Ask a question about {symbol} data..."
                   onkeydown="if (event.key === 'Enter') ask()">
            <button onclick="ask()">Ask</button>
        </div>
        <div class="status" id="chat-status"></div>
        <div class="hint">The API key is read from the GEMINI_API_KEY environment variable on the server.</div>
    </div>

    <script>
        let chart = null;
        let sessionId = null;

        function showTab(name) {{
            for (const tab of ['chart', 'chat']) {{
                document.getElementById('panel-' + tab).classList.toggle('active', tab === name);
                document.getElementById('tab-' + tab).classList.toggle('active', tab === name);
            }}
        }}

        // Line points carry value: null where a band has no levels; the
        // widget wants those as whitespace points (time only).
        function toLineData(points) {{
            return points.map(p => p.value == null
                ? {{ time: p.time }}
                : {{ time: p.time, value: p.value, color: p.color }});
        }}

        async function loadChart() {{
            const status = document.getElementById('chart-status');
            try {{
                const response = await fetch('/api/chart');
                if (!response.ok) throw new Error('HTTP ' + response.status);
                const charts = await response.json();
                const container = document.getElementById('chart-container');
                if (chart) {{ chart.remove(); }}

                for (const spec of charts) {{
                    chart = LightweightCharts.createChart(container, {{
                        height: spec.options.height,
                        rightPriceScale: {{ visible: spec.options.rightPriceScale.visible }},
                        layout: {{
                            background: {{ type: 'solid', color: '#131722' }},
                            textColor: '#d1d4dc',
                        }},
                        grid: {{
                            vertLines: {{ color: '#1e222d' }},
                            horzLines: {{ color: '#1e222d' }},
                        }},
                    }});

                    let markerTarget = null;
                    for (const series of spec.series) {{
                        if (series.type === 'Candlestick') {{
                            const candles = chart.addCandlestickSeries({{
                                upColor: '#00c853',
                                downColor: '#ff5252',
                                borderUpColor: '#00c853',
                                borderDownColor: '#ff5252',
                                wickUpColor: '#00c853',
                                wickDownColor: '#ff5252',
                            }});
                            candles.setData(series.data);
                            markerTarget = candles;
                        }} else if (series.type === 'Line') {{
                            const line = chart.addLineSeries({{
                                color: series.color,
                                lineWidth: series.lineWidth,
                                title: series.title,
                                priceLineVisible: false,
                                lastValueVisible: false,
                            }});
                            line.setData(toLineData(series.data));
                        }}
                    }}
                    if (markerTarget) {{
                        markerTarget.setMarkers(spec.markers);
                    }}
                    chart.timeScale().fitContent();
                }}
                status.textContent = '';
            }} catch (err) {{
                status.textContent = 'Failed to load chart: ' + err.message;
            }}
        }}

        function renderTurn(question, answer) {{
            const log = document.getElementById('chat-log');
            const div = document.createElement('div');
            div.className = 'chat-turn';
            const you = document.createElement('div');
            you.innerHTML = '<span class="you">You:</span> ';
            you.append(question);
            const bot = document.createElement('div');
            bot.innerHTML = '<span class="bot">Gemini:</span> ';
            bot.append(answer);
            div.append(you, bot);
            log.append(div);
            log.scrollTop = log.scrollHeight;
        }}

        async function ask() {{
            const input = document.getElementById('chat-question');
            const status = document.getElementById('chat-status');
            const question = input.value.trim();
            if (!question) return;
            input.value = '';
            status.textContent = 'Gemini is thinking...';
            try {{
                const response = await fetch('/api/chat', {{
                    method: 'POST',
                    headers: {{ 'Content-Type': 'application/json' }},
                    body: JSON.stringify({{ session_id: sessionId, question }}),
                }});
                if (!response.ok) throw new Error('HTTP ' + response.status);
                const body = await response.json();
                sessionId = body.session_id;
                renderTurn(question, body.answer);
                status.textContent = '';
            }} catch (err) {{
                status.textContent = 'Chat failed: ' + err.message;
            }}
        }}

        loadChart();
    </script>
</body>
</html>"##
    );

    Html(html)
}
